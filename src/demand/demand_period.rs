use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct DemandPeriod {
    pub label: String,
    pub index: usize,
    pub start_minute: f64,
    pub end_minute: f64,
}

impl DemandPeriod {
    pub fn new(label: impl Into<String>, index: usize, start_minute: f64, end_minute: f64) -> Self {
        DemandPeriod {
            label: label.into(),
            index,
            start_minute,
            end_minute,
        }
    }

    pub fn duration_minutes(&self) -> f64 {
        self.end_minute - self.start_minute
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes() / 60.0
    }

    pub fn contains(&self, minute: f64) -> bool {
        minute >= self.start_minute && minute < self.end_minute
    }
}

/// Keyed by label; index assigned on load. A minute exactly on a period
/// boundary belongs to the later period, because membership is a half-open
/// interval `[start, end)`.
#[derive(Debug, Clone, Default)]
pub struct DemandPeriodTable {
    periods: Vec<DemandPeriod>,
    index_by_label: HashMap<String, usize>,
}

impl DemandPeriodTable {
    pub fn new(periods: Vec<DemandPeriod>) -> Self {
        let index_by_label = periods.iter().map(|p| (p.label.clone(), p.index)).collect();
        DemandPeriodTable { periods, index_by_label }
    }

    pub fn get_by_label(&self, label: &str) -> Option<&DemandPeriod> {
        self.index_by_label.get(label).map(|&i| &self.periods[i])
    }

    pub fn get(&self, index: usize) -> &DemandPeriod {
        &self.periods[index]
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DemandPeriod> {
        self.periods.iter()
    }

    /// The period a departure minute falls into. Boundary minutes resolve to
    /// the later period because `contains` uses `[start, end)`.
    pub fn period_for_minute(&self, minute: f64) -> Option<&DemandPeriod> {
        self.periods.iter().find(|p| p.contains(minute))
    }
}

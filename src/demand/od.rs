use std::collections::HashMap;

/// (origin zone, destination zone, demand period, agent type). The column
/// pool is keyed by this tuple everywhere.
pub type OdKey = (u16, u16, usize, usize);

#[derive(Debug, Clone, Default)]
pub struct OdMatrix {
    entries: HashMap<OdKey, f64>,
}

impl OdMatrix {
    pub fn new() -> Self {
        OdMatrix::default()
    }

    pub fn set(&mut self, key: OdKey, volume: f64) {
        if volume > 0.0 {
            self.entries.insert(key, volume);
        } else {
            self.entries.remove(&key);
        }
    }

    pub fn get(&self, key: OdKey) -> f64 {
        self.entries.get(&key).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OdKey, &f64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys touching a given origin zone, for the per-origin TDSP fan-out.
    pub fn keys_for_origin(&self, origin_zone: u16) -> Vec<OdKey> {
        self.entries
            .keys()
            .filter(|(o, _, _, _)| *o == origin_zone)
            .copied()
            .collect()
    }
}

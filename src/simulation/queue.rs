//! Per-link mesoscopic queue state: a release-capacity accumulator in the
//! style of the teacher's `Flowcap`, a storage limit in the style of its
//! `StorageCap`, and a FIFO of agents in transit.

use std::collections::VecDeque;

use crate::config::FlowModel;

/// Accumulates release capacity over time so a link can "bank" unused
/// capacity from idle intervals, same accrual rule as the teacher's
/// `Flowcap`, capped at one interval's worth.
#[derive(Debug, Clone)]
pub struct Flowcap {
    last_update_interval: u32,
    accumulated: f64,
    capacity_per_interval: f64,
}

impl Flowcap {
    pub fn new(capacity_per_hour: f64, interval_seconds: u32) -> Self {
        let capacity_per_interval = capacity_per_hour * interval_seconds as f64 / 3600.0;
        Flowcap {
            last_update_interval: 0,
            accumulated: capacity_per_interval,
            capacity_per_interval,
        }
    }

    pub fn update(&mut self, now: u32) {
        if self.last_update_interval < now {
            let steps = (now - self.last_update_interval) as f64;
            self.accumulated = (self.accumulated + steps * self.capacity_per_interval).min(self.capacity_per_interval);
            self.last_update_interval = now;
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.accumulated > 1e-9
    }

    pub fn consume(&mut self, by: f64) {
        self.accumulated -= by;
    }
}

/// Storage limit in vehicles, consumed as agents enter a link and released as
/// they leave. Unlike the teacher's two-phase `release`/`apply_released`
/// split (needed there to stay independent of parallel node-processing
/// order), this engine processes links in a single deterministic ascending
/// pass per interval, so consuming and releasing immediately is sufficient.
#[derive(Debug, Clone)]
pub struct StorageCap {
    pub max: f64,
    pub used: f64,
}

impl StorageCap {
    pub fn new(max: f64) -> Self {
        StorageCap { max, used: 0.0 }
    }

    pub fn consume(&mut self, value: f64) {
        self.used = self.max.min(self.used + value);
    }

    pub fn release(&mut self, value: f64) {
        self.used = (self.used - value).max(0.0);
    }

    pub fn available(&self) -> f64 {
        self.max - self.used
    }
}

#[derive(Debug, Clone, Copy)]
struct QueuedAgent {
    agent_index: usize,
    ready_interval: u32,
}

/// One link's mesoscopic state. FIFO order is the vector's front-to-back
/// order; pushes append, releases pop from the front.
#[derive(Debug, Clone)]
pub struct LinkQueue {
    pub flow_model: FlowModel,
    flowcap: Flowcap,
    storage: Option<StorageCap>,
    pub backward_wave_speed_mph: f64,
    free_flow_intervals: u32,
    fifo: VecDeque<QueuedAgent>,
    pub cumulative_inflow: u64,
    pub cumulative_outflow: u64,
}

impl LinkQueue {
    pub fn new(
        flow_model: FlowModel,
        capacity_per_hour: f64,
        interval_seconds: u32,
        free_flow_intervals: u32,
        storage_capacity_vehicles: Option<f64>,
        backward_wave_speed_mph: f64,
    ) -> Self {
        LinkQueue {
            flow_model,
            flowcap: Flowcap::new(capacity_per_hour, interval_seconds),
            storage: storage_capacity_vehicles.map(StorageCap::new),
            backward_wave_speed_mph,
            free_flow_intervals: free_flow_intervals.max(1),
            fifo: VecDeque::new(),
            cumulative_inflow: 0,
            cumulative_outflow: 0,
        }
    }

    pub fn update_flowcap(&mut self, now: u32) {
        self.flowcap.update(now);
    }

    pub fn push(&mut self, agent_index: usize, now: u32) {
        let ready_interval = now + self.free_flow_intervals;
        self.fifo.push_back(QueuedAgent { agent_index, ready_interval });
        if let Some(storage) = &mut self.storage {
            storage.consume(1.0);
        }
        self.cumulative_inflow += 1;
    }

    pub fn on_link_count(&self) -> usize {
        self.fifo.len()
    }

    pub fn peek_agent(&self) -> Option<usize> {
        self.fifo.front().map(|q| q.agent_index)
    }

    pub fn ready_for_release(&self, now: u32) -> bool {
        self.fifo.front().is_some_and(|q| q.ready_interval <= now) && self.flowcap.has_capacity()
    }

    /// Pops the FIFO head. Caller must have confirmed [`Self::ready_for_release`].
    pub fn release_head(&mut self) -> usize {
        let entry = self.fifo.pop_front().expect("release_head called on an empty or not-ready queue");
        self.flowcap.consume(1.0);
        if let Some(storage) = &mut self.storage {
            storage.release(1.0);
        }
        self.cumulative_outflow += 1;
        entry.agent_index
    }

    /// Remaining room for inbound vehicles; infinite for point-queue links,
    /// which have no storage limit.
    pub fn available_downstream_space(&self) -> f64 {
        self.storage.as_ref().map(StorageCap::available).unwrap_or(f64::INFINITY)
    }
}

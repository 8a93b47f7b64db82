//! Simulated agents and bulk agent creation from a converged column pool.

use crate::column::ColumnPool;
use crate::demand::DemandPeriodTable;

/// One simulated trip: a concrete departure time and the fixed node/link
/// path of the column it was drawn from. `arrival_interval[i]` is filled in
/// during simulation with the interval the agent finished traversing
/// `links[i]`, i.e. arrived at that link's head node.
#[derive(Debug, Clone)]
pub struct Agent {
    pub index: usize,
    pub origin_zone: u16,
    pub dest_zone: u16,
    pub agent_type_index: usize,
    pub departure_interval: u32,
    pub nodes: Vec<usize>,
    pub links: Vec<usize>,
    pub arrival_interval: Vec<Option<u32>>,
}

impl Agent {
    pub fn new(
        index: usize,
        origin_zone: u16,
        dest_zone: u16,
        agent_type_index: usize,
        departure_interval: u32,
        nodes: Vec<usize>,
        links: Vec<usize>,
    ) -> Self {
        let arrival_interval = vec![None; links.len()];
        Agent {
            index,
            origin_zone,
            dest_zone,
            agent_type_index,
            departure_interval,
            nodes,
            links,
            arrival_interval,
        }
    }
}

/// Rounds each column's flow volume to a whole vehicle count and spreads the
/// departures evenly (deterministically) across the column's demand period.
/// OD keys are walked in the pool's sorted order and agent indices are
/// assigned in that same order, so agent numbering is reproducible.
pub fn build_agents_from_columns(
    pool: &ColumnPool,
    demand_periods: &DemandPeriodTable,
    resolution_in_second: u32,
) -> Vec<Agent> {
    let mut agents = Vec::new();
    let mut next_index = 0usize;

    for key in pool.keys_sorted() {
        let cv = pool.get(key).expect("key came from keys_sorted on the same pool");
        let period = demand_periods.get(key.2);
        let period_start_interval = (period.start_minute * 60.0 / resolution_in_second as f64).round() as u32;
        let period_intervals = (((period.duration_minutes() * 60.0) / resolution_in_second as f64).floor() as u32).max(1);

        for column in &cv.columns {
            let count = column.volume.round() as u32;
            if count == 0 {
                continue;
            }
            for i in 0..count {
                let offset = ((i as u64 * period_intervals as u64) / count as u64) as u32;
                let departure_interval = period_start_interval + offset.min(period_intervals - 1);
                agents.push(Agent::new(
                    next_index,
                    key.0,
                    key.1,
                    key.3,
                    departure_interval,
                    column.nodes.clone(),
                    column.links.clone(),
                ));
                next_index += 1;
            }
        }
    }

    agents
}

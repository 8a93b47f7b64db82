//! Path-flow records: one row per surviving column in the final pool.

use crate::column::ColumnPool;
use crate::network::Network;

#[derive(Debug, Clone)]
pub struct ColumnRecord {
    pub origin_zone: u16,
    pub dest_zone: u16,
    pub period_index: usize,
    pub agent_type_index: usize,
    pub volume: f64,
    pub travel_time: f64,
    pub node_ids: Vec<String>,
    pub link_ids: Vec<String>,
}

/// One record per column across every OD key, in the pool's deterministic
/// ascending-key order. Zero-volume columns (never selected by any
/// redistribution step) are skipped.
pub fn project_columns(network: &Network, pool: &ColumnPool) -> Vec<ColumnRecord> {
    let mut records = Vec::new();
    for key in pool.keys_sorted() {
        let cv = pool.get(key).expect("key came from keys_sorted on the same pool");
        for column in &cv.columns {
            if column.volume <= 0.0 {
                continue;
            }
            records.push(ColumnRecord {
                origin_zone: key.0,
                dest_zone: key.1,
                period_index: key.2,
                agent_type_index: key.3,
                volume: column.volume,
                travel_time: column.travel_time,
                node_ids: column.nodes.iter().map(|&n| network.node(n).id.clone()).collect(),
                link_ids: column.links.iter().map(|&l| network.link(l).id.clone()).collect(),
            });
        }
    }
    records
}

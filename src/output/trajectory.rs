//! Per-agent trajectory records: the node path of the column an agent was
//! drawn from, plus the wall-clock timestamp it reached each node.

use crate::network::Network;
use crate::output::timestamp::format_interval;
use crate::simulation::agent::Agent;

#[derive(Debug, Clone)]
pub struct TrajectoryRecord {
    pub agent_index: usize,
    pub origin_zone: u16,
    pub dest_zone: u16,
    pub departure_timestamp: String,
    pub node_ids: Vec<String>,
    pub node_timestamps: Vec<Option<String>>,
}

/// One record per agent: its node-id path and, for every node after the
/// first, the timestamp it arrived there (`None` if the agent never
/// finished that link within the simulation horizon).
pub fn project_trajectories(network: &Network, agents: &[Agent], start_minute: f64, resolution_in_second: u32) -> Vec<TrajectoryRecord> {
    agents
        .iter()
        .map(|agent| {
            let node_ids: Vec<String> = agent.nodes.iter().map(|&n| network.node(n).id.clone()).collect();
            let mut node_timestamps: Vec<Option<String>> = vec![None];
            node_timestamps.extend(
                agent
                    .arrival_interval
                    .iter()
                    .map(|maybe_interval| maybe_interval.map(|i| format_interval(i, start_minute, resolution_in_second))),
            );

            TrajectoryRecord {
                agent_index: agent.index,
                origin_zone: agent.origin_zone,
                dest_zone: agent.dest_zone,
                departure_timestamp: format_interval(agent.departure_interval, start_minute, resolution_in_second),
                node_ids,
                node_timestamps,
            }
        })
        .collect()
}

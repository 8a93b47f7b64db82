//! Time-dependent shortest path: label-correcting search with a deque using
//! the shortest-label-first (SLF) rule, over the network restricted to links
//! that allow the given agent type.

use std::collections::VecDeque;

use crate::demand::AgentType;
use crate::link_performance::generalized_cost_for;
use crate::network::Network;

/// Labels produced by one TDSP run from a single origin zone's anchor node.
pub struct TdspLabels {
    pub dist: Vec<f64>,
    pred_link: Vec<Option<usize>>,
    tail_of: Vec<usize>,
    source: usize,
}

impl TdspLabels {
    pub fn is_reachable(&self, node_index: usize) -> bool {
        self.dist[node_index].is_finite()
    }

    /// Reconstructs the node and link path from the origin anchor to
    /// `dest_node`. `None` if unreachable.
    pub fn path_to(&self, dest_node: usize) -> Option<(Vec<usize>, Vec<usize>)> {
        if !self.is_reachable(dest_node) {
            return None;
        }

        let mut nodes = vec![dest_node];
        let mut links = Vec::new();
        let mut current = dest_node;

        while current != self.source {
            let link_index = self.pred_link[current]?;
            links.push(link_index);
            current = self.tail_of[current];
            nodes.push(current);
        }

        nodes.reverse();
        links.reverse();
        Some((nodes, links))
    }
}

fn edge_weight(network: &Network, link_index: usize, period_index: usize, agent_type: &AgentType) -> f64 {
    let link = network.link(link_index);
    let state = link.period(period_index);
    generalized_cost_for(state.tt, state.toll, agent_type)
}

/// Runs label correcting from `origin_zone`'s synthesized origin anchor over
/// links that allow `agent_type`, using `gc_a(period)` as edge weight.
pub fn time_dependent_shortest_path(
    network: &Network,
    period_index: usize,
    agent_type: &AgentType,
    origin_zone: u16,
) -> TdspLabels {
    let num_nodes = network.nodes().len();
    let source = network
        .zone(origin_zone)
        .origin_anchor
        .expect("connector synthesis must run before routing");

    let mut dist = vec![f64::INFINITY; num_nodes];
    let mut pred_link: Vec<Option<usize>> = vec![None; num_nodes];
    let mut tail_of: Vec<usize> = (0..num_nodes).collect();
    let mut in_queue = vec![false; num_nodes];

    dist[source] = 0.0;
    let mut deque: VecDeque<usize> = VecDeque::new();
    deque.push_back(source);
    in_queue[source] = true;

    while let Some(u) = deque.pop_front() {
        in_queue[u] = false;
        let out_links = network.node(u).out_links.clone();
        for link_index in out_links {
            let link = network.link(link_index);
            if !link.allows(agent_type.index) {
                continue;
            }
            let v = link.head_node;
            let weight = edge_weight(network, link_index, period_index, agent_type);
            let candidate = dist[u] + weight;

            if candidate < dist[v] {
                dist[v] = candidate;
                pred_link[v] = Some(link_index);
                tail_of[v] = u;
                if !in_queue[v] {
                    let push_front = deque.front().is_some_and(|&front| candidate < dist[front]);
                    if push_front {
                        deque.push_front(v);
                    } else {
                        deque.push_back(v);
                    }
                    in_queue[v] = true;
                }
            }
        }
    }

    TdspLabels {
        dist,
        pred_link,
        tail_of,
        source,
    }
}

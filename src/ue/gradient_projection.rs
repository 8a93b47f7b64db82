//! Flow redistribution: method-of-successive-averages initialization for a
//! freshly generated column, and the gradient-projection step that moves
//! volume from above-average-cost columns onto the minimum-cost column.

use crate::column::ColumnVec;
use crate::demand::AgentType;
use crate::link_performance::generalized_cost_for;
use crate::network::Network;

const GRADIENT_EPSILON: f64 = 1e-6;

fn column_travel_time(network: &Network, period_index: usize, links: &[usize]) -> f64 {
    links.iter().map(|&l| network.link(l).period(period_index).tt).sum()
}

fn column_cost(network: &Network, period_index: usize, agent_type: &AgentType, links: &[usize]) -> f64 {
    links
        .iter()
        .map(|&l| {
            let state = network.link(l).period(period_index);
            generalized_cost_for(state.tt, state.toll, agent_type)
        })
        .sum()
}

/// Refreshes every column's cached `travel_time`/`cost` from the current
/// link performance state, without touching volumes.
pub fn refresh_column_metrics(cv: &mut ColumnVec, network: &Network, period_index: usize, agent_type: &AgentType) {
    for column in cv.columns.iter_mut() {
        column.travel_time = column_travel_time(network, period_index, &column.links);
        column.cost = column_cost(network, period_index, agent_type, &column.links);
    }
}

/// MSA initialization of a freshly added column: the new column gets
/// `q / (k + 1)` of the OD volume, every pre-existing column is scaled by
/// `k / (k + 1)`, preserving total OD flow.
pub fn msa_initialize_new_column(cv: &mut ColumnVec, outer_iteration: usize) {
    let new_index = cv.last_new_index.expect("msa_initialize_new_column called without a new column");
    let denom = (outer_iteration + 1) as f64;
    let scale_existing = outer_iteration as f64 / denom;
    let od_volume = cv.od_volume;

    for (index, column) in cv.columns.iter_mut().enumerate() {
        if index == new_index {
            column.volume = od_volume / denom;
        } else {
            column.volume *= scale_existing;
        }
    }
}

/// One gradient-projection step for a single OD's column pool: moves volume
/// from every column whose travel time exceeds the minimum onto the
/// minimum-cost column, using a Polyak-style decreasing step size
/// `1 / (k_total + 2)`. The minimum-cost column never loses volume.
pub fn gradient_projection_step(cv: &mut ColumnVec, network: &Network, period_index: usize, k_total: usize) {
    if cv.columns.len() < 2 {
        if let Some(column) = cv.columns.first_mut() {
            column.travel_time = column_travel_time(network, period_index, &column.links);
        }
        return;
    }

    for column in cv.columns.iter_mut() {
        column.travel_time = column_travel_time(network, period_index, &column.links);
        column.gradient = column.travel_time;
    }

    let (min_index, min_cost) = cv
        .columns
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.gradient.partial_cmp(&b.1.gradient).unwrap())
        .map(|(i, c)| (i, c.gradient))
        .expect("checked non-empty above");

    let step = 1.0 / (k_total as f64 + 2.0);
    let scale = min_cost.max(GRADIENT_EPSILON);

    let mut moved = 0.0;
    for (index, column) in cv.columns.iter_mut().enumerate() {
        if index == min_index {
            continue;
        }
        let delta = (step * (column.gradient - min_cost) / scale).clamp(0.0, column.volume);
        column.volume -= delta;
        moved += delta;
    }
    cv.columns[min_index].volume += moved;
}

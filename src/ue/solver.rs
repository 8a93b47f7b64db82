//! Orchestrates column generation and column optimization: the outer UE
//! loop that drives the TDSP <-> column pool <-> link performance feedback
//! until a fixed iteration budget is spent.

use std::collections::HashMap;
use std::thread;

use ahash::HashMap as ShardMap;
use tracing::{debug, error, info};

use crate::column::{ColumnPool, ColumnVec};
use crate::config::AssignmentConfig;
use crate::demand::{AgentTypeTable, DemandPeriodTable, OdKey, OdMatrix};
use crate::error::{DtaError, DtaResult};
use crate::link_performance::update_link_travel_time;
use crate::network::Network;
use crate::routing::time_dependent_shortest_path;
use crate::ue::gradient_projection::{gradient_projection_step, msa_initialize_new_column, refresh_column_metrics};

pub struct UeResult {
    pub pool: ColumnPool,
    pub iterations_run: usize,
}

/// Runs column generation (`column_generation_num` iterations) followed by
/// column optimization (`column_update_num` iterations) to a user
/// equilibrium path-flow pattern. Mutates `network`'s per-period link volume
/// and travel time as a side effect.
pub fn run_ue(
    network: &mut Network,
    agent_types: &AgentTypeTable,
    demand_periods: &DemandPeriodTable,
    od_matrix: &OdMatrix,
    config: &AssignmentConfig,
) -> DtaResult<UeResult> {
    config.validate()?;

    info!(
        column_generation_num = config.column_generation_num,
        column_update_num = config.column_update_num,
        thread_nums = config.thread_nums,
        "starting UE solve"
    );

    let mut pool = ColumnPool::new(network.num_zones());
    let mut k_total = 0usize;

    for k in 0..config.column_generation_num {
        update_link_travel_time(network, demand_periods)?;
        pool.reset_iteration_flags();
        run_tdsp_phase(network, agent_types, od_matrix, &mut pool, config.thread_nums)?;
        redistribute_after_generation(&mut pool, network, agent_types, k, k_total);
        rebuild_link_volumes(network, agent_types, demand_periods.len(), &pool);
        debug!(iteration = k, phase = "column_generation", "UE iteration complete");
        k_total += 1;
    }

    for k in 0..config.column_update_num {
        update_link_travel_time(network, demand_periods)?;
        optimize_all(&mut pool, network, agent_types, k_total);
        rebuild_link_volumes(network, agent_types, demand_periods.len(), &pool);
        debug!(iteration = k, phase = "column_optimization", "UE iteration complete");
        k_total += 1;
    }

    if let Err(err) = validate_pool_nonempty(&pool, od_matrix) {
        error!(%err, "UE solve finished with an empty column for a positive-demand OD");
        return Err(err);
    }

    let relative_gap = compute_relative_gap(&pool);
    info!(iterations_run = k_total, relative_gap, "UE solve converged");

    Ok(UeResult {
        pool,
        iterations_run: k_total,
    })
}

/// Average-excess-cost style relative gap: the share of total travel cost
/// spent above each OD's cheapest column, as a fraction of the cheapest-cost
/// baseline. Reported for observability only; the outer loop runs a fixed
/// iteration count regardless of this value.
fn compute_relative_gap(pool: &ColumnPool) -> f64 {
    let mut actual_cost = 0.0;
    let mut best_cost = 0.0;

    for (_, cv) in pool.iter() {
        let total_volume: f64 = cv.columns.iter().map(|c| c.volume).sum();
        if total_volume <= 0.0 {
            continue;
        }
        let min_cost = cv
            .columns
            .iter()
            .map(|c| c.cost)
            .fold(f64::INFINITY, f64::min);
        actual_cost += cv.columns.iter().map(|c| c.volume * c.cost).sum::<f64>();
        best_cost += total_volume * min_cost;
    }

    if best_cost <= 0.0 {
        0.0
    } else {
        (actual_cost - best_cost) / best_cost
    }
}

fn validate_pool_nonempty(pool: &ColumnPool, od_matrix: &OdMatrix) -> DtaResult<()> {
    for (&key, &q) in od_matrix.iter() {
        if q <= 0.0 {
            continue;
        }
        match pool.get(key) {
            Some(cv) if !cv.columns.is_empty() => {}
            _ => return Err(DtaError::EmptyPool { od: key }),
        }
    }
    Ok(())
}

/// Parallel worker pool over origin zones: each worker owns a contiguous,
/// disjoint range of column-pool shards and runs TDSP for every (period,
/// agent-type) pair with demand from the zones in its range, writing new
/// candidate paths directly into its own shards. No locking is needed
/// because shards never alias across workers.
fn run_tdsp_phase(
    network: &Network,
    agent_types: &AgentTypeTable,
    od_matrix: &OdMatrix,
    pool: &mut ColumnPool,
    thread_nums: usize,
) -> DtaResult<()> {
    let num_zones = pool.num_shards();
    if num_zones == 0 {
        return Ok(());
    }
    let num_workers = thread_nums.min(num_zones).max(1);
    let chunk_size = (num_zones + num_workers - 1) / num_workers;

    let errors: Vec<DtaError> = thread::scope(|scope| {
        let mut handles = Vec::new();
        let mut zone_offset = 0usize;
        for shard_chunk in pool.shards_mut().chunks_mut(chunk_size) {
            let start_zone = zone_offset;
            zone_offset += shard_chunk.len();
            let handle = scope.spawn(move || -> Vec<DtaError> {
                let mut errors = Vec::new();
                for (offset, shard) in shard_chunk.iter_mut().enumerate() {
                    let origin_zone = (start_zone + offset) as u16;
                    if let Err(e) = process_origin_zone(network, agent_types, od_matrix, shard, origin_zone) {
                        errors.push(e);
                    }
                }
                errors
            });
            handles.push(handle);
        }
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    if let Some(first) = errors.into_iter().next() {
        return Err(first);
    }
    Ok(())
}

fn process_origin_zone(
    network: &Network,
    agent_types: &AgentTypeTable,
    od_matrix: &OdMatrix,
    shard: &mut ShardMap<OdKey, ColumnVec>,
    origin_zone: u16,
) -> DtaResult<()> {
    let keys = od_matrix.keys_for_origin(origin_zone);
    if keys.is_empty() {
        return Ok(());
    }

    let mut by_period_and_type: HashMap<(usize, usize), Vec<OdKey>> = HashMap::new();
    for key in keys {
        by_period_and_type.entry((key.2, key.3)).or_default().push(key);
    }

    for ((period_index, agent_type_index), od_keys) in by_period_and_type {
        let agent_type = agent_types.get(agent_type_index);
        let labels = time_dependent_shortest_path(network, period_index, agent_type, origin_zone);

        for key in od_keys {
            let q = od_matrix.get(key);
            if q <= 0.0 {
                continue;
            }
            let dest_anchor = network
                .zone(key.1)
                .dest_anchor
                .expect("connector synthesis must run before the UE solver");

            match labels.path_to(dest_anchor) {
                None => {
                    let err = DtaError::UnreachableOd { od: key };
                    error!(%err, "no finite-cost path for OD with positive demand");
                    return Err(err);
                }
                Some((nodes, links)) => {
                    let cv = shard.entry(key).or_insert_with(|| ColumnVec::new(q));
                    cv.add_path(nodes, links);
                }
            }
        }
    }
    Ok(())
}

/// Single-threaded barrier: per OD key, in ascending lexicographic order,
/// either MSA-initializes the column just added this iteration or takes a
/// gradient-projection step if none was added.
fn redistribute_after_generation(
    pool: &mut ColumnPool,
    network: &Network,
    agent_types: &AgentTypeTable,
    outer_iteration: usize,
    k_total: usize,
) {
    for key in pool.keys_sorted() {
        let cv = pool.get_mut(key).unwrap();
        if cv.new_column_added {
            msa_initialize_new_column(cv, outer_iteration);
        } else {
            gradient_projection_step(cv, network, key.2, k_total);
        }
        refresh_column_metrics(cv, network, key.2, agent_types.get(key.3));
    }
}

fn optimize_all(pool: &mut ColumnPool, network: &Network, agent_types: &AgentTypeTable, k_total: usize) {
    for key in pool.keys_sorted() {
        let cv = pool.get_mut(key).unwrap();
        gradient_projection_step(cv, network, key.2, k_total);
        refresh_column_metrics(cv, network, key.2, agent_types.get(key.3));
    }
}

/// Sums every column's volume (weighted by its agent type's PCE) onto the
/// links it traverses, for the given demand period.
fn rebuild_link_volumes(network: &mut Network, agent_types: &AgentTypeTable, num_periods: usize, pool: &ColumnPool) {
    for link in network.links_mut() {
        for period_index in 0..num_periods {
            link.period_mut(period_index).vol = 0.0;
        }
    }

    for (key, cv) in pool.iter() {
        let pce = agent_types.get(key.3).pce;
        let period_index = key.2;
        for column in &cv.columns {
            if column.volume <= 0.0 {
                continue;
            }
            for &link_index in &column.links {
                network.link_mut(link_index).period_mut(period_index).vol += column.volume * pce;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::{AgentType, DemandPeriod};
    use crate::network::{AgentTypeMask, Link, Node, Zone};
    use assert_approx_eq::assert_approx_eq;

    fn two_link_parallel_network() -> (Network, AgentTypeTable, DemandPeriodTable, OdMatrix) {
        let nodes = vec![Node::new("A", 0, None, 0.0, 0.0), Node::new("B", 1, None, 1.0, 0.0)];
        let links = vec![
            Link::new(0, "L1", 0, 1, 10.0, 60.0, 1, 1000.0, AgentTypeMask::all(1)),
            Link::new(1, "L2", 0, 1, 10.0, 60.0, 1, 1000.0, AgentTypeMask::all(1)),
        ];
        let mut network = Network::build(nodes, links).unwrap();
        network
            .set_zones(vec![
                Zone::new("ZA", 0).with_member_nodes(vec![0]),
                Zone::new("ZB", 1).with_member_nodes(vec![1]),
            ])
            .unwrap();
        let periods = DemandPeriodTable::new(vec![DemandPeriod::new("AM", 0, 0.0, 60.0)]);
        network.init_periods(periods.len());
        network.synthesize_connectors(1, 1).unwrap();

        let agent_types = AgentTypeTable::new(vec![AgentType::new("auto", 0, 15.0, 1.0, true)]);
        let mut od = OdMatrix::new();
        od.set((0, 1, 0, 0), 1600.0);
        (network, agent_types, periods, od)
    }

    #[test]
    fn two_link_parallel_network_splits_evenly() {
        let (mut network, agent_types, periods, od) = two_link_parallel_network();
        let config = AssignmentConfig {
            column_generation_num: 20,
            column_update_num: 20,
            thread_nums: 1,
        };

        let result = run_ue(&mut network, &agent_types, &periods, &od, &config).unwrap();

        let real_link_volume = |id: &str| -> f64 {
            result
                .pool
                .iter()
                .flat_map(|(_, cv)| cv.columns.iter())
                .filter(|c| c.links.iter().any(|&l| network.link(l).id == id))
                .map(|c| c.volume)
                .sum()
        };
        let vol_l1 = real_link_volume("L1");
        let vol_l2 = real_link_volume("L2");

        assert_approx_eq!(800.0, vol_l1, 1.0);
        assert_approx_eq!(800.0, vol_l2, 1.0);
        assert_approx_eq!(10.6144, network.link(0).period(0).tt, 1e-2);
    }

    #[test]
    fn parallel_and_serial_runs_agree() {
        let (mut network_serial, agent_types, periods, od) = two_link_parallel_network();
        let (mut network_parallel, _, _, _) = two_link_parallel_network();

        let serial_config = AssignmentConfig {
            column_generation_num: 15,
            column_update_num: 15,
            thread_nums: 1,
        };
        let parallel_config = AssignmentConfig {
            thread_nums: 4,
            ..serial_config.clone()
        };

        let serial = run_ue(&mut network_serial, &agent_types, &periods, &od, &serial_config).unwrap();
        let parallel = run_ue(&mut network_parallel, &agent_types, &periods, &od, &parallel_config).unwrap();

        assert_approx_eq!(
            network_serial.link(0).period(0).vol,
            network_parallel.link(0).period(0).vol,
            1e-6
        );
        assert_eq!(serial.iterations_run, parallel.iterations_run);
    }

    #[test]
    fn demand_conservation_holds_at_every_od() {
        let (mut network, agent_types, periods, od) = two_link_parallel_network();
        let config = AssignmentConfig {
            column_generation_num: 10,
            column_update_num: 10,
            thread_nums: 1,
        };
        let result = run_ue(&mut network, &agent_types, &periods, &od, &config).unwrap();
        for (&key, &q) in od.iter() {
            let total: f64 = result.pool.get(key).unwrap().total_volume();
            assert_approx_eq!(q, total, 1e-6);
        }
    }

    #[test]
    fn relative_gap_is_near_zero_once_converged() {
        let (mut network, agent_types, periods, od) = two_link_parallel_network();
        let config = AssignmentConfig {
            column_generation_num: 20,
            column_update_num: 20,
            thread_nums: 1,
        };
        let result = run_ue(&mut network, &agent_types, &periods, &od, &config).unwrap();
        assert!(compute_relative_gap(&result.pool) < 1e-3);
    }

    #[test]
    fn zero_demand_creates_no_columns() {
        let nodes = vec![Node::new("A", 0, None, 0.0, 0.0), Node::new("B", 1, None, 1.0, 0.0)];
        let links = vec![Link::new(0, "L1", 0, 1, 10.0, 60.0, 1, 1000.0, AgentTypeMask::all(1))];
        let mut network = Network::build(nodes, links).unwrap();
        network
            .set_zones(vec![
                Zone::new("ZA", 0).with_member_nodes(vec![0]),
                Zone::new("ZB", 1).with_member_nodes(vec![1]),
            ])
            .unwrap();
        let periods = DemandPeriodTable::new(vec![DemandPeriod::new("AM", 0, 0.0, 60.0)]);
        network.init_periods(1);
        network.synthesize_connectors(1, 1).unwrap();
        let agent_types = AgentTypeTable::new(vec![AgentType::new("auto", 0, 15.0, 1.0, true)]);
        let od = OdMatrix::new();

        let config = AssignmentConfig {
            column_generation_num: 3,
            column_update_num: 0,
            thread_nums: 1,
        };
        let result = run_ue(&mut network, &agent_types, &periods, &od, &config).unwrap();
        assert_eq!(0, result.pool.iter().count());
    }

    #[test]
    fn unreachable_od_with_positive_demand_is_fatal() {
        let nodes = vec![Node::new("A", 0, None, 0.0, 0.0), Node::new("B", 1, None, 1.0, 0.0)];
        let links: Vec<Link> = Vec::new();
        let mut network = Network::build(nodes, links).unwrap();
        network
            .set_zones(vec![
                Zone::new("ZA", 0).with_member_nodes(vec![0]),
                Zone::new("ZB", 1).with_member_nodes(vec![1]),
            ])
            .unwrap();
        let periods = DemandPeriodTable::new(vec![DemandPeriod::new("AM", 0, 0.0, 60.0)]);
        network.init_periods(1);
        network.synthesize_connectors(1, 1).unwrap();
        let agent_types = AgentTypeTable::new(vec![AgentType::new("auto", 0, 15.0, 1.0, true)]);
        let mut od = OdMatrix::new();
        od.set((0, 1, 0, 0), 100.0);

        let config = AssignmentConfig {
            column_generation_num: 1,
            column_update_num: 0,
            thread_nums: 1,
        };
        let result = run_ue(&mut network, &agent_types, &periods, &od, &config);
        assert!(matches!(result, Err(DtaError::UnreachableOd { .. })));
    }
}

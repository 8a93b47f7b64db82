//! Link performance records: period-resolved UE volumes/speeds and
//! time-sliced simulated volumes/densities/speeds. Connectors are synthetic
//! bookkeeping links with zero length and infinite capacity and carry no
//! meaningful performance of their own, so both projections skip them.

use crate::demand::DemandPeriodTable;
use crate::network::Network;
use crate::simulation::SimulationOutput;

#[derive(Debug, Clone)]
pub struct UeLinkPerformanceRecord {
    pub link_id: String,
    pub period_label: String,
    pub volume: f64,
    pub travel_time: f64,
    pub voc: f64,
    pub speed: f64,
}

/// One row per (link, period): volume, travel time, volume/capacity ratio,
/// and the speed implied by `length / travel_time`.
pub fn project_ue_link_performance(network: &Network, demand_periods: &DemandPeriodTable) -> Vec<UeLinkPerformanceRecord> {
    let mut records = Vec::new();
    for link in network.links() {
        if link.is_connector {
            continue;
        }
        for period in demand_periods.iter() {
            let state = link.period(period.index);
            let voc = state.vol / (link.capacity * period.duration_hours());
            let speed = if state.tt > 0.0 { link.length / (state.tt / 60.0) } else { link.free_speed };
            records.push(UeLinkPerformanceRecord {
                link_id: link.id.clone(),
                period_label: period.label.clone(),
                volume: state.vol,
                travel_time: state.tt,
                voc,
                speed,
            });
        }
    }
    records
}

#[derive(Debug, Clone)]
pub struct DtaLinkPerformanceRecord {
    pub link_id: String,
    pub slice_start_label: String,
    pub slice_end_label: String,
    pub volume: f64,
    pub density: f64,
    pub speed: f64,
}

fn on_link_trace(inflow: &[u64], outflow: &[u64]) -> Vec<u64> {
    let mut trace = Vec::with_capacity(inflow.len());
    let mut count: i64 = 0;
    for i in 0..inflow.len() {
        count += inflow[i] as i64 - outflow[i] as i64;
        trace.push(count.max(0) as u64);
    }
    trace
}

/// Aggregates simulated per-interval inflow/outflow into fixed-width time
/// slices (default 15 minutes). Density is the average on-link vehicle
/// count (derived from the cumulative inflow/outflow difference) over
/// `length`; speed follows the fundamental flow identity `speed = flow /
/// density`, falling back to free-flow speed when the slice carries no
/// flow.
pub fn project_dta_link_performance(
    network: &Network,
    output: &SimulationOutput,
    resolution_in_second: u32,
    start_minute: f64,
    slice_minutes: f64,
) -> Vec<DtaLinkPerformanceRecord> {
    let intervals_per_slice = (((slice_minutes * 60.0) / resolution_in_second as f64).round() as usize).max(1);
    let mut records = Vec::new();

    for (link_index, link) in network.links().iter().enumerate() {
        if link.is_connector {
            continue;
        }
        let inflow = &output.inflow[link_index];
        let outflow = &output.outflow[link_index];
        let trace = on_link_trace(inflow, outflow);
        let num_intervals = outflow.len();

        let mut slice_start = 0usize;
        while slice_start < num_intervals {
            let slice_end = (slice_start + intervals_per_slice).min(num_intervals);
            let volume: u64 = outflow[slice_start..slice_end].iter().sum();
            let slice_hours = (slice_end - slice_start) as f64 * resolution_in_second as f64 / 3600.0;
            let avg_on_link = trace[slice_start..slice_end].iter().sum::<u64>() as f64 / (slice_end - slice_start) as f64;
            let density = if link.length > 0.0 { avg_on_link / link.length } else { 0.0 };
            let flow_vph = volume as f64 / slice_hours;
            let speed = if density > 0.0 { flow_vph / density } else { link.free_speed };

            records.push(DtaLinkPerformanceRecord {
                link_id: link.id.clone(),
                slice_start_label: crate::output::timestamp::format_interval(slice_start as u32, start_minute, resolution_in_second),
                slice_end_label: crate::output::timestamp::format_interval(slice_end as u32, start_minute, resolution_in_second),
                volume: volume as f64,
                density,
                speed,
            });

            slice_start = slice_end;
        }
    }
    records
}

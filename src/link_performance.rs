//! Bureau of Public Roads volume-delay function and the period-resolved
//! travel-time update that closes the UE feedback loop.

use tracing::error;

use crate::demand::{AgentType, DemandPeriodTable};
use crate::error::{DtaError, DtaResult};
use crate::network::Network;

/// `tt = fftt * (1 + alpha * (vol / (cap * duration_hours))^beta)`.
pub fn bpr_travel_time(fftt: f64, vol: f64, capacity: f64, duration_hours: f64, alpha: f64, beta: f64) -> f64 {
    let denom = capacity * duration_hours;
    let ratio = vol / denom;
    fftt * (1.0 + alpha * ratio.powf(beta))
}

/// Toll-free generalized cost caches to `tt`, since a single per-(link,
/// period) cache cannot hold every agent type's value-of-time at once. When a
/// link does carry a toll, callers should use [`generalized_cost_for`]
/// instead of the cached field, because the toll term is agent-type-specific.
pub fn generalized_cost_for(tt: f64, toll: f64, agent_type: &AgentType) -> f64 {
    if toll == 0.0 {
        tt
    } else {
        tt + toll * 60.0 / agent_type.vot
    }
}

/// Recomputes `tt` and `gc` for every (link, period) pair from the current
/// link volumes. Called once per UE outer iteration. `gc` caches the
/// VOT-agnostic baseline (`tt`, toll-free); it is deliberately not the true
/// generalized cost, since a single per-(link, period) slot cannot hold
/// every agent type's toll term at once. Callers that need the real
/// generalized cost (the router, the gradient-projection step) always go
/// through [`generalized_cost_for`] with the agent type's VOT instead of
/// reading this field.
pub fn update_link_travel_time(network: &mut Network, demand_periods: &DemandPeriodTable) -> DtaResult<()> {
    for link in network.links_mut() {
        for period in demand_periods.iter() {
            let capacity = link.capacity;
            if capacity <= 0.0 {
                let err = DtaError::NumericFault(format!(
                    "link '{}' has non-positive capacity in period '{}'",
                    link.id, period.label
                ));
                error!(%err, link_id = %link.id, period = %period.label, "zero-capacity link in an active period");
                return Err(err);
            }

            let state = link.period_mut(period.index);
            let tt = bpr_travel_time(
                state.fftt,
                state.vol,
                capacity,
                period.duration_hours(),
                link.alpha,
                link.beta,
            );

            if tt.is_nan() || tt.is_infinite() {
                let err = DtaError::NumericFault(format!(
                    "non-finite travel time on link '{}' period '{}'",
                    link.id, period.label
                ));
                error!(%err, link_id = %link.id, period = %period.label, "non-finite travel time");
                return Err(err);
            }
            if state.vol < 0.0 {
                let err = DtaError::NumericFault(format!(
                    "negative volume on link '{}' period '{}'",
                    link.id, period.label
                ));
                error!(%err, link_id = %link.id, period = %period.label, "negative link volume");
                return Err(err);
            }

            state.tt = tt;
            state.gc = tt;
        }
    }
    Ok(())
}

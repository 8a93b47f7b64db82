//! Dynamic Traffic Assignment core: column-generation user equilibrium over
//! a BPR-performance road network, plus an optional mesoscopic simulation
//! that loads the resulting flows onto per-link queues and records
//! trajectories. CLI handling, tabular I/O, and settings decoding are an
//! external collaborator's job; this crate's contract is: take a populated
//! [`network::Network`], [`demand::AgentTypeTable`],
//! [`demand::DemandPeriodTable`] and [`demand::OdMatrix`], hand back a
//! converged [`column::ColumnPool`] and, optionally, simulated link
//! performance and trajectories.

pub mod column;
pub mod config;
pub mod demand;
pub mod error;
pub mod link_performance;
pub mod logging;
pub mod network;
pub mod output;
pub mod routing;
pub mod simulation;
pub mod ue;

pub use column::{Column, ColumnPool, ColumnVec};
pub use config::{AssignmentConfig, Config, FlowModel, SimulationConfig};
pub use demand::{AgentType, AgentTypeTable, DemandPeriod, DemandPeriodTable, OdKey, OdMatrix};
pub use error::{DtaError, DtaResult};
pub use network::{AgentTypeMask, Link, Network, Node, Zone};
pub use ue::{run_ue, UeResult};

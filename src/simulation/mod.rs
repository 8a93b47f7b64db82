pub mod agent;
pub mod engine;
pub mod queue;

pub use agent::{build_agents_from_columns, Agent};
pub use engine::{run_simulation, SimulationOutput};
pub use queue::LinkQueue;

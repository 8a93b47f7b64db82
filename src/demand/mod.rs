pub mod agent_type;
pub mod demand_period;
pub mod od;

pub use agent_type::{AgentType, AgentTypeTable};
pub use demand_period::{DemandPeriod, DemandPeriodTable};
pub use od::{OdKey, OdMatrix};

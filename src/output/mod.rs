pub mod columns;
pub mod link_performance;
pub mod timestamp;
pub mod trajectory;

pub use columns::{project_columns, ColumnRecord};
pub use link_performance::{project_dta_link_performance, project_ue_link_performance, DtaLinkPerformanceRecord, UeLinkPerformanceRecord};
pub use trajectory::{project_trajectories, TrajectoryRecord};

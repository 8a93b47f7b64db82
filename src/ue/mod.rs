pub mod gradient_projection;
pub mod solver;

pub use solver::{run_ue, UeResult};

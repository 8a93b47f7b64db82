pub mod tdsp;

pub use tdsp::{time_dependent_shortest_path, TdspLabels};

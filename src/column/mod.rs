pub mod column;
pub mod pool;

pub use column::Column;
pub use pool::{ColumnPool, ColumnVec};

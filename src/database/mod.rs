pub mod pool;

pub use pool::{create_pool, is_unique_violation};

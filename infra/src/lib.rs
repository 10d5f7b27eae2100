pub mod ids;
pub mod pool;

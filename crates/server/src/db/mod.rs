pub mod opening_graphs;
pub mod pool;

#![allow(clippy::result_large_err)]

pub mod cluster;
pub mod driver;

pub use cluster::parse_cluster_nodes;
pub use driver::{Endpoint, RedisExecutor};

#![doc = "Run configuration and pipeline behind the `sqw-sim` command line tool."]

pub mod config;
pub mod pipeline;

pub use config::{QueryConfig, QueryKind, RunConfig};
pub use pipeline::{evaluate, run, write_queries, RunSummary};

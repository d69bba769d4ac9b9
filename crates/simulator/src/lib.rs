//! Support code for the `symposium-sim` binary.
//!
//! Loads an optional TOML config file, layers command-line overrides on top
//! and summarizes a finished run.
//!
//! ```toml
//! active_tables = 5
//! seats_per_table = 5
//! poll_interval_ms = 500
//! detection = "wait-for-graph"
//! migration = "retire"
//! seed = 12345
//!
//! [timing]
//! thinking_ms = 10000
//! eating_ms = 5000
//! wait_for_fork_ms = 4000
//! rounds = 25
//! ```

mod config;
mod report;

pub use config::{FileConfig, LoadError, TimingSection};
pub use report::{RunReport, TableSummary};

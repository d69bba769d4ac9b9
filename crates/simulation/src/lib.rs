//! Dining-philosophers simulation runner.
//!
//! Builds the active tables plus one overflow table, spawns a tokio task per
//! philosopher and runs a periodic monitor that looks for deadlocked tables
//! and relieves them by moving one philosopher to the overflow table.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  tables: Vec<Table>   (active 0..N, overflow N)    │ │
//! │  │  each seat = philosopher task + published status   │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ every poll_interval         │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  DeadlockDetector::assess_table(active table)      │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ deadlocked                  │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  migrate → overflow seat; overflow deadlocked?     │ │
//! │  │  yes → halt every task, OverflowDeadlocked         │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod runner;

pub use config::{MigrationPolicy, SimulationConfig};
pub use error::ConfigError;
pub use runner::{MonitorState, SimulationOutcome, SimulationRunner, SimulationStats};

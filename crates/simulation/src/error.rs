//! Error types for simulation setup.

use thiserror::Error;

/// Invalid simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A ring needs at least two seats for forks to be shared.
    #[error("A table needs at least 2 seats, got {0}")]
    TooFewSeats(u32),

    /// Nothing to simulate without an active table.
    #[error("At least one active table is required")]
    NoActiveTables,

    /// The monitor would spin.
    #[error("Monitor poll interval must be non-zero")]
    ZeroPollInterval,

    /// Table or philosopher ids would not fit in a `u32`.
    #[error("{active_tables} tables of {seats_per_table} seats is too many philosophers")]
    TooManyPhilosophers {
        active_tables: u32,
        seats_per_table: u32,
    },
}

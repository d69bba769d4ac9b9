//! Configuration for a simulation run.

use crate::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use symposium_core::PhilosopherTiming;
use symposium_deadlock::DetectionMode;
use symposium_types::TableId;

/// What happens to the original task of a migrated philosopher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationPolicy {
    /// Cancel the original task. It puts down the forks it holds at its
    /// old table and ends.
    #[default]
    Retire,

    /// Leave the original task running on its old forks. It is no longer
    /// seated anywhere, so the monitor stops looking at it, but it keeps
    /// contending until its rounds run out.
    ///
    /// The detached task and its overflow replacement share one
    /// [`PhilosopherId`](symposium_types::PhilosopherId), so
    /// [`Fork::holder`](symposium_core::Fork::holder) can report that id on
    /// up to four forks at once: at most two at the old table and two at the
    /// overflow table. Each task on its own still holds at most two.
    Detach,
}

impl fmt::Display for MigrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationPolicy::Retire => f.write_str("retire"),
            MigrationPolicy::Detach => f.write_str("detach"),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Seats (and forks) per table.
    pub seats_per_table: u32,

    /// Number of active tables. The overflow table comes after them.
    pub active_tables: u32,

    /// Philosopher think/eat/wait bounds and round budget.
    pub timing: PhilosopherTiming,

    /// Time between monitor scans.
    pub poll_interval: Duration,

    /// Deadlock signature used by the monitor.
    pub detection: DetectionMode,

    /// Fate of a migrated philosopher's original task.
    pub migration: MigrationPolicy,

    /// Random seed for philosopher and monitor RNG streams.
    pub seed: u64,
}

impl SimulationConfig {
    /// Create a configuration with `active_tables` tables of `seats_per_table`.
    pub fn new(active_tables: u32, seats_per_table: u32) -> Self {
        Self {
            seats_per_table,
            active_tables,
            timing: PhilosopherTiming::default(),
            poll_interval: Duration::from_millis(500),
            detection: DetectionMode::default(),
            migration: MigrationPolicy::default(),
            seed: 12345,
        }
    }

    /// Set the philosopher timing.
    pub fn with_timing(mut self, timing: PhilosopherTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Set the monitor poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the deadlock detection mode.
    pub fn with_detection(mut self, detection: DetectionMode) -> Self {
        self.detection = detection;
        self
    }

    /// Set the migration policy.
    pub fn with_migration(mut self, migration: MigrationPolicy) -> Self {
        self.migration = migration;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Id of the overflow table.
    pub fn overflow_table(&self) -> TableId {
        TableId(self.active_tables)
    }

    /// Total number of tables, overflow included.
    pub fn total_tables(&self) -> u32 {
        self.active_tables + 1
    }

    /// Number of philosophers seated at startup.
    pub fn total_philosophers(&self) -> u32 {
        self.active_tables * self.seats_per_table
    }

    /// Check the configuration can be simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seats_per_table < 2 {
            return Err(ConfigError::TooFewSeats(self.seats_per_table));
        }
        if self.active_tables == 0 {
            return Err(ConfigError::NoActiveTables);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        // Table ids run up to the overflow table and philosopher ids up to
        // active_tables * seats_per_table; both must fit in u32.
        if self.active_tables.checked_add(1).is_none()
            || self.active_tables.checked_mul(self.seats_per_table).is_none()
        {
            return Err(ConfigError::TooManyPhilosophers {
                active_tables: self.active_tables,
                seats_per_table: self.seats_per_table,
            });
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(5, 5)
    }
}

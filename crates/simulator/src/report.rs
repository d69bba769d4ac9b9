//! End-of-run summary.

use std::fmt;
use std::time::Duration;
use symposium_simulation::{SimulationOutcome, SimulationRunner, SimulationStats};
use symposium_types::TableId;

/// Seat occupancy of one table when the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSummary {
    pub table: TableId,
    pub overflow: bool,
    pub seated: usize,
    pub live: usize,
    pub size: u32,
}

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: SimulationOutcome,
    pub elapsed: Duration,
    pub stats: SimulationStats,
    pub tables: Vec<TableSummary>,
}

impl RunReport {
    /// Capture the runner's state. Call before [`SimulationRunner::shutdown`],
    /// which empties every seat.
    pub fn collect(runner: &SimulationRunner, outcome: SimulationOutcome, elapsed: Duration) -> Self {
        let overflow = runner.overflow().id();
        let tables = runner
            .tables()
            .iter()
            .map(|table| TableSummary {
                table: table.id(),
                overflow: table.id() == overflow,
                seated: table.seated_count(),
                live: table.live_count(),
                size: table.size(),
            })
            .collect();

        Self {
            outcome,
            elapsed,
            stats: runner.stats(),
            tables,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Outcome: {} after {:.1?}", self.outcome, self.elapsed)?;
        writeln!(
            f,
            "Scans: {}, deadlocks: {}, migrations: {}, skipped: {}",
            self.stats.scans,
            self.stats.deadlocks_detected,
            self.stats.migrations,
            self.stats.migrations_skipped
        )?;
        for t in &self.tables {
            let label = if t.overflow { " (overflow)" } else { "" };
            writeln!(
                f,
                "  {}{label}: {}/{} seated, {} live",
                t.table, t.seated, t.size, t.live
            )?;
        }
        Ok(())
    }
}

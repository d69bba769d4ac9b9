//! Observable simulation events.
//!
//! Every state change a philosopher or the monitor goes through is reported
//! as a [`SimEvent`]. Events are always logged through `tracing`; when an
//! [`EventLog`] is built with [`EventLog::channel`] they are also delivered,
//! in emission order per sender, to the returned receiver.

use std::fmt;
use std::sync::Arc;
use symposium_types::{SeatIndex, TableId};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    // ═══════════════════════════════════════════════════════════════════════
    // Philosopher Events
    // ═══════════════════════════════════════════════════════════════════════
    /// Started a thinking period (`round` counts from 1).
    Thinking {
        name: Arc<str>,
        table: TableId,
        round: u32,
    },

    /// Done thinking, about to try the left fork.
    Hungry { name: Arc<str>, table: TableId },

    /// Took the left fork.
    LeftForkAcquired { name: Arc<str>, table: TableId },

    /// Left fork was held by a neighbour; back to thinking.
    LeftForkDenied { name: Arc<str>, table: TableId },

    /// Right fork was held by a neighbour; left fork put back down.
    RightForkDenied { name: Arc<str>, table: TableId },

    /// Took the right fork and started eating.
    Eating { name: Arc<str>, table: TableId },

    /// Finished eating and put both forks down.
    FinishedEating { name: Arc<str>, table: TableId },

    /// Round budget exhausted; the philosopher's task ends.
    RoundsExhausted {
        name: Arc<str>,
        table: TableId,
        rounds: u32,
    },

    /// Cancelled while suspended; held forks were put down and the task ends.
    Interrupted { name: Arc<str>, table: TableId },

    // ═══════════════════════════════════════════════════════════════════════
    // Monitor Events
    // ═══════════════════════════════════════════════════════════════════════
    /// The deadlock signature held for an active table.
    DeadlockDetected { table: TableId },

    /// A philosopher was moved from a deadlocked table to the overflow table.
    PhilosopherMoved {
        name: Arc<str>,
        from: TableId,
        to: TableId,
        seat: SeatIndex,
    },

    /// The overflow table had no empty seat, so nobody was moved.
    MigrationSkipped { from: TableId, overflow: TableId },

    /// The overflow table itself matched the deadlock signature.
    OverflowDeadlocked { table: TableId },
}

impl SimEvent {
    /// Table the event happened at (the source table for migrations).
    pub fn table(&self) -> TableId {
        match self {
            SimEvent::Thinking { table, .. }
            | SimEvent::Hungry { table, .. }
            | SimEvent::LeftForkAcquired { table, .. }
            | SimEvent::LeftForkDenied { table, .. }
            | SimEvent::RightForkDenied { table, .. }
            | SimEvent::Eating { table, .. }
            | SimEvent::FinishedEating { table, .. }
            | SimEvent::RoundsExhausted { table, .. }
            | SimEvent::Interrupted { table, .. }
            | SimEvent::DeadlockDetected { table }
            | SimEvent::OverflowDeadlocked { table } => *table,
            SimEvent::PhilosopherMoved { from, .. } | SimEvent::MigrationSkipped { from, .. } => {
                *from
            }
        }
    }

    /// Name of the philosopher involved, for philosopher-level events.
    pub fn philosopher(&self) -> Option<&str> {
        match self {
            SimEvent::Thinking { name, .. }
            | SimEvent::Hungry { name, .. }
            | SimEvent::LeftForkAcquired { name, .. }
            | SimEvent::LeftForkDenied { name, .. }
            | SimEvent::RightForkDenied { name, .. }
            | SimEvent::Eating { name, .. }
            | SimEvent::FinishedEating { name, .. }
            | SimEvent::RoundsExhausted { name, .. }
            | SimEvent::Interrupted { name, .. }
            | SimEvent::PhilosopherMoved { name, .. } => Some(name),
            SimEvent::DeadlockDetected { .. }
            | SimEvent::MigrationSkipped { .. }
            | SimEvent::OverflowDeadlocked { .. } => None,
        }
    }

    /// Check if this event was raised by the monitor rather than a philosopher.
    pub fn is_monitor(&self) -> bool {
        matches!(
            self,
            SimEvent::DeadlockDetected { .. }
                | SimEvent::PhilosopherMoved { .. }
                | SimEvent::MigrationSkipped { .. }
                | SimEvent::OverflowDeadlocked { .. }
        )
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimEvent::Thinking { name, .. } => write!(f, "{name} is thinking."),
            SimEvent::Hungry { name, .. } => {
                write!(f, "{name} is hungry and trying to pick up the left fork.")
            }
            SimEvent::LeftForkAcquired { name, .. } => {
                write!(f, "{name} picked up the left fork.")
            }
            SimEvent::LeftForkDenied { name, .. } => {
                write!(f, "{name} could not pick up the left fork.")
            }
            SimEvent::RightForkDenied { name, .. } => write!(
                f,
                "{name} could not pick up the right fork. Putting down left fork."
            ),
            SimEvent::Eating { name, .. } => {
                write!(f, "{name} picked up the right fork. Now eating.")
            }
            SimEvent::FinishedEating { name, .. } => {
                write!(f, "{name} finished eating and put down both forks.")
            }
            SimEvent::RoundsExhausted { name, rounds, .. } => {
                write!(f, "{name} is done after {rounds} rounds.")
            }
            SimEvent::Interrupted { name, .. } => {
                write!(f, "{name} was interrupted and left the table.")
            }
            SimEvent::DeadlockDetected { table } => write!(
                f,
                "Deadlock detected at table {}. Moving a philosopher to the overflow table.",
                table.0
            ),
            SimEvent::PhilosopherMoved { name, to, seat, .. } => write!(
                f,
                "{name} moved to the overflow table (table {}, seat {}).",
                to.0, seat.0
            ),
            SimEvent::MigrationSkipped { from, overflow } => write!(
                f,
                "Overflow table {} is full; nobody moved from table {}.",
                overflow.0, from.0
            ),
            SimEvent::OverflowDeadlocked { table } => write!(
                f,
                "Overflow table {} has deadlocked! Simulation ends.",
                table.0
            ),
        }
    }
}

/// Sink for [`SimEvent`]s.
///
/// Cheap to clone; every philosopher task and the monitor hold one.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    tx: Option<mpsc::UnboundedSender<SimEvent>>,
}

impl EventLog {
    /// Create a log that only writes to `tracing`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that also forwards every event to the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SimEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Record an event.
    pub fn emit(&self, event: SimEvent) {
        let table = event.table().0;
        let philosopher = event.philosopher().unwrap_or("-");
        if event.is_monitor() {
            warn!(table, philosopher, "{}", event);
        } else {
            info!(table, philosopher, "{}", event);
        }

        if let Some(tx) = &self.tx {
            // Ignore send errors - the observer may have gone away
            let _ = tx.send(event);
        }
    }
}

//! Philosopher lifecycle phase.

use std::fmt;

/// Where a philosopher currently is in its think/eat cycle.
///
/// ```text
/// Thinking ──► Hungry ──► HoldingLeft ──► Eating ──► Thinking
///                │             │
///                └─────────────┴──(fork denied)──► Thinking
///
/// any ──► Finished     (round budget exhausted)
/// any ──► Interrupted  (cancelled while suspended)
/// ```
///
/// Stored in an atomic byte by the philosopher's status block, hence the
/// explicit discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Sleeping for a random thinking period.
    Thinking = 0,
    /// About to try the left fork.
    Hungry = 1,
    /// Holding the left fork, waiting before trying the right one.
    HoldingLeft = 2,
    /// Holding both forks.
    Eating = 3,
    /// Round budget exhausted; the task has ended.
    Finished = 4,
    /// Cancelled while suspended; the task has ended.
    Interrupted = 5,
}

impl Phase {
    /// Decode a phase from its stored byte.
    ///
    /// Unknown bytes decode as `Interrupted`; only `as_u8` ever writes them.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::Thinking,
            1 => Phase::Hungry,
            2 => Phase::HoldingLeft,
            3 => Phase::Eating,
            4 => Phase::Finished,
            _ => Phase::Interrupted,
        }
    }

    /// Encode this phase for atomic storage.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the philosopher's task has ended in this phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Interrupted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Thinking => "thinking",
            Phase::Hungry => "hungry",
            Phase::HoldingLeft => "holding-left",
            Phase::Eating => "eating",
            Phase::Finished => "finished",
            Phase::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_byte_encoding() {
        for phase in [
            Phase::Thinking,
            Phase::Hungry,
            Phase::HoldingLeft,
            Phase::Eating,
            Phase::Finished,
            Phase::Interrupted,
        ] {
            assert_eq!(Phase::from_u8(phase.as_u8()), phase);
        }
    }

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Finished.is_terminal());
        assert!(Phase::Interrupted.is_terminal());
        assert!(!Phase::HoldingLeft.is_terminal());
        assert!(!Phase::Eating.is_terminal());
    }
}

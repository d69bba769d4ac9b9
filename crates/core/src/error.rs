//! Error types for fork handling.

use symposium_types::{ForkId, PhilosopherId};
use thiserror::Error;

/// Errors raised by misuse of a [`Fork`](crate::Fork).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForkError {
    /// A philosopher tried to put down a fork it does not hold.
    ///
    /// `holder` is whoever actually held the fork at the attempt, or `None`
    /// if it was free.
    #[error("{caller} released {fork} without holding it (holder: {holder:?})")]
    NotHeld {
        fork: ForkId,
        caller: PhilosopherId,
        holder: Option<PhilosopherId>,
    },
}

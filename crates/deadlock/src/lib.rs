//! Deadlock signatures for philosopher tables.
//!
//! The monitor asks a [`DeadlockDetector`] about one table at a time. The
//! detector snapshots every seated philosopher into a [`Participant`] (read
//! from published status, never from the forks themselves) and applies one
//! of two signatures:
//!
//! - [`DetectionMode::NoneEating`] - coarse heuristic, "nobody is eating right
//!   now". Cheap, and prone to false positives on idle tables.
//! - [`DetectionMode::WaitForGraph`] - builds a [`WaitForGraph`] from held and
//!   wanted forks and reports only genuine circular waits.

mod detector;
mod wait_for;

pub use detector::{DeadlockDetector, DetectionMode, Evidence, Participant, Verdict};
pub use wait_for::WaitForGraph;

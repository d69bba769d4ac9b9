//! Core identifiers for the dining-philosophers simulation.
//!
//! Everything here is plain data: table, seat, philosopher and fork
//! identifiers plus the [`Phase`] a philosopher publishes while it runs.
//! Behaviour lives in `symposium-core`.

mod identifiers;
mod phase;

pub use identifiers::{ForkId, PhilosopherId, SeatIndex, TableId};
pub use phase::Phase;

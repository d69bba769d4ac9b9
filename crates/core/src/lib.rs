//! Contention model for the dining-philosophers simulation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── Table ────────────────────────┐
//! │                                                       │
//! │   Fork 0 ── Seat 0 ── Fork 1 ── Seat 1 ── Fork 2 ...  │
//! │     ▲                                        │        │
//! │     └──────────── Seat N-1 ◄── Fork N-1 ◄────┘        │
//! │                                                       │
//! │   Seat = Philosopher task + PhilosopherStatus         │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! - [`Fork`] - non-blocking binary lock with holder tracking
//! - [`Philosopher`] - the think/eat state machine, one tokio task each
//! - [`PhilosopherStatus`] - atomics a philosopher publishes for observers
//! - [`Table`] / [`Seat`] - ring wiring and seat bookkeeping
//! - [`EventLog`] / [`SimEvent`] - the observable event stream

mod error;
mod event;
mod fork;
mod philosopher;
mod table;
mod timing;

pub use error::ForkError;
pub use event::{EventLog, SimEvent};
pub use fork::Fork;
pub use philosopher::{Philosopher, PhilosopherExit, PhilosopherStatus};
pub use table::{Seat, Table};
pub use timing::PhilosopherTiming;

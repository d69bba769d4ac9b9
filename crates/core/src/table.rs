//! A ring of seats and forks.
//!
//! Seat `i` uses fork `i` as its left fork and fork `(i + 1) mod N` as its
//! right fork, so every fork is shared by two neighbours and the whole table
//! forms the classic cyclic dependency that allows circular wait.

use crate::{EventLog, Fork, Philosopher, PhilosopherExit, PhilosopherStatus};
use std::sync::Arc;
use symposium_types::{ForkId, PhilosopherId, SeatIndex, TableId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A philosopher occupying a seat, together with its running task.
#[derive(Debug)]
pub struct Seat {
    philosopher: PhilosopherId,
    name: Arc<str>,
    left: ForkId,
    right: ForkId,
    status: Arc<PhilosopherStatus>,
    cancel: CancellationToken,
    task: JoinHandle<PhilosopherExit>,
}

impl Seat {
    /// Spawn `philosopher` and record it as the seat's occupant.
    ///
    /// `cancel` stops this philosopher only; pass a child token to let a
    /// parent token stop the whole simulation.
    pub fn launch(philosopher: Philosopher, events: EventLog, cancel: CancellationToken) -> Self {
        Self {
            philosopher: philosopher.id(),
            name: philosopher.name().clone(),
            left: philosopher.left().id(),
            right: philosopher.right().id(),
            status: philosopher.status(),
            cancel: cancel.clone(),
            task: philosopher.spawn(events, cancel),
        }
    }

    /// Get the occupant's id.
    pub fn philosopher(&self) -> PhilosopherId {
        self.philosopher
    }

    /// Get the occupant's display name.
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Get the left fork id.
    pub fn left(&self) -> ForkId {
        self.left
    }

    /// Get the right fork id.
    pub fn right(&self) -> ForkId {
        self.right
    }

    /// Get the occupant's published status.
    pub fn status(&self) -> &PhilosopherStatus {
        &self.status
    }

    /// Whether the occupant's task is still running its rounds.
    pub fn is_live(&self) -> bool {
        !self.task.is_finished() && !self.status.phase().is_terminal()
    }

    /// Stop the occupant and hand back its task handle.
    ///
    /// The task puts down whatever it holds before it ends.
    pub fn retire(self) -> JoinHandle<PhilosopherExit> {
        self.cancel.cancel();
        self.task
    }

    /// Hand back the task handle without stopping it.
    ///
    /// The task keeps cycling on its original forks, outside any table's
    /// bookkeeping.
    pub fn detach(self) -> JoinHandle<PhilosopherExit> {
        self.task
    }
}

/// A table: N forks and N seats arranged in a ring.
#[derive(Debug)]
pub struct Table {
    id: TableId,
    forks: Vec<Arc<Fork>>,
    seats: Vec<Option<Seat>>,
}

impl Table {
    /// Create a table with `size` free forks and `size` empty seats.
    pub fn new(id: TableId, size: u32) -> Self {
        Self {
            id,
            forks: (0..size)
                .map(|index| Arc::new(Fork::new(ForkId::new(id, index))))
                .collect(),
            seats: (0..size).map(|_| None).collect(),
        }
    }

    /// Get the table id.
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Number of seats (and forks).
    pub fn size(&self) -> u32 {
        self.forks.len() as u32
    }

    /// Get all forks in ring order.
    pub fn forks(&self) -> &[Arc<Fork>] {
        &self.forks
    }

    /// Get the `(left, right)` forks of a seat.
    pub fn seat_forks(&self, seat: SeatIndex) -> (Arc<Fork>, Arc<Fork>) {
        let right = seat.next(self.size());
        (
            self.forks[seat.index()].clone(),
            self.forks[right.index()].clone(),
        )
    }

    /// Get the occupant of a seat, if any.
    pub fn seat(&self, seat: SeatIndex) -> Option<&Seat> {
        self.seats.get(seat.index()).and_then(Option::as_ref)
    }

    /// Iterate over occupied seats.
    pub fn occupants(&self) -> impl Iterator<Item = (SeatIndex, &Seat)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, seat)| seat.as_ref().map(|s| (SeatIndex(i as u32), s)))
    }

    /// Indexes of occupied seats.
    pub fn occupied_seats(&self) -> Vec<SeatIndex> {
        self.occupants().map(|(index, _)| index).collect()
    }

    /// First empty seat in ring order.
    pub fn first_empty_seat(&self) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(Option::is_none)
            .map(|i| SeatIndex(i as u32))
    }

    /// Number of occupied seats.
    pub fn seated_count(&self) -> usize {
        self.seats.iter().filter(|seat| seat.is_some()).count()
    }

    /// Number of occupants whose tasks are still running.
    pub fn live_count(&self) -> usize {
        self.occupants().filter(|(_, seat)| seat.is_live()).count()
    }

    /// Put an occupant into a seat, returning whoever was there before.
    pub fn occupy(&mut self, seat: SeatIndex, occupant: Seat) -> Option<Seat> {
        self.seats[seat.index()].replace(occupant)
    }

    /// Empty a seat, returning its occupant.
    ///
    /// The occupant's forks are not touched; see [`Seat::retire`] and
    /// [`Seat::detach`].
    pub fn vacate(&mut self, seat: SeatIndex) -> Option<Seat> {
        self.seats.get_mut(seat.index()).and_then(Option::take)
    }

    /// Empty every seat, returning the occupants.
    pub fn clear(&mut self) -> Vec<Seat> {
        self.seats.iter_mut().filter_map(Option::take).collect()
    }
}

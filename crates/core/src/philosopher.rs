//! Philosopher state machine.
//!
//! A philosopher runs as its own tokio task and cycles through a bounded
//! number of rounds:
//!
//! ```text
//! Thinking ─► Hungry ─┬─ left denied ──────────────────────────► Thinking
//!                     └─ left taken ─► HoldingLeft ─(wait_for_fork)─┐
//!                                                                   │
//!             ┌─ right denied: put left down ──────────────► Thinking
//!             └─ right taken ─► Eating ─► put both down ───► Thinking
//! ```
//!
//! It only ever touches its own two forks. Everything the monitor needs is
//! published through [`PhilosopherStatus`], so the monitor never has to look
//! at forks.
//!
//! Sleeps are the only suspension points and each one is also a cancellation
//! point: a cancelled philosopher puts down what it holds and ends.

use crate::{EventLog, Fork, ForkError, PhilosopherTiming, SimEvent};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use symposium_types::{Phase, PhilosopherId, SeatIndex, TableId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Status a running philosopher publishes for observers.
///
/// Written only by the philosopher's own task; read by anyone. Ordering of
/// writes keeps `eating` implying both `holds_left` and `holds_right`:
/// `eating` is raised after both forks are taken and lowered before either
/// is put down.
#[derive(Debug)]
pub struct PhilosopherStatus {
    phase: AtomicU8,
    eating: AtomicBool,
    holds_left: AtomicBool,
    holds_right: AtomicBool,
    rounds_completed: AtomicU32,
}

impl Default for PhilosopherStatus {
    fn default() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Thinking.as_u8()),
            eating: AtomicBool::new(false),
            holds_left: AtomicBool::new(false),
            holds_right: AtomicBool::new(false),
            rounds_completed: AtomicU32::new(0),
        }
    }
}

impl PhilosopherStatus {
    /// Current phase.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Whether the philosopher is eating right now.
    pub fn is_eating(&self) -> bool {
        self.eating.load(Ordering::Acquire)
    }

    /// Whether the philosopher holds its left fork.
    pub fn holds_left(&self) -> bool {
        self.holds_left.load(Ordering::Acquire)
    }

    /// Whether the philosopher holds its right fork.
    pub fn holds_right(&self) -> bool {
        self.holds_right.load(Ordering::Acquire)
    }

    /// Completed think/eat cycles, successful or not.
    pub fn rounds_completed(&self) -> u32 {
        self.rounds_completed.load(Ordering::Acquire)
    }

    /// Whether the philosopher is holding its left fork and waiting to try
    /// the right one.
    pub fn is_waiting_for_right(&self) -> bool {
        self.phase() == Phase::HoldingLeft && self.holds_left() && !self.holds_right()
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.store(phase.as_u8(), Ordering::Release);
    }

    fn set_eating(&self, eating: bool) {
        self.eating.store(eating, Ordering::Release);
    }

    fn set_holds_left(&self, holds: bool) {
        self.holds_left.store(holds, Ordering::Release);
    }

    fn set_holds_right(&self, holds: bool) {
        self.holds_right.store(holds, Ordering::Release);
    }

    fn complete_round(&self) {
        self.rounds_completed.fetch_add(1, Ordering::AcqRel);
    }
}

/// How a philosopher's task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhilosopherExit {
    /// Ran through its whole round budget.
    Finished { rounds: u32 },
    /// Cancelled while suspended.
    Interrupted { rounds_completed: u32 },
    /// A fork refused to be put down.
    Misuse(ForkError),
}

/// Why the round loop stopped early.
enum Halt {
    Interrupted,
    Misuse(ForkError),
}

impl From<ForkError> for Halt {
    fn from(err: ForkError) -> Self {
        Halt::Misuse(err)
    }
}

/// A philosopher bound to a seat and its two forks.
pub struct Philosopher {
    id: PhilosopherId,
    name: Arc<str>,
    table: TableId,
    seat: SeatIndex,
    left: Arc<Fork>,
    right: Arc<Fork>,
    timing: PhilosopherTiming,
    status: Arc<PhilosopherStatus>,
    rng: ChaCha8Rng,
}

impl Philosopher {
    /// Create a philosopher with a fresh round counter.
    ///
    /// # Arguments
    ///
    /// * `id` - Identity, kept across migrations
    /// * `name` - Display name used in events
    /// * `table` / `seat` - Where the philosopher sits
    /// * `forks` - `(left, right)` forks of that seat
    /// * `timing` - Think/eat/wait bounds and round budget
    /// * `seed` - Seed for this philosopher's private RNG
    pub fn new(
        id: PhilosopherId,
        name: Arc<str>,
        (table, seat): (TableId, SeatIndex),
        (left, right): (Arc<Fork>, Arc<Fork>),
        timing: PhilosopherTiming,
        seed: u64,
    ) -> Self {
        Self {
            id,
            name,
            table,
            seat,
            left,
            right,
            timing,
            status: Arc::new(PhilosopherStatus::default()),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Get the philosopher's id.
    pub fn id(&self) -> PhilosopherId {
        self.id
    }

    /// Get the philosopher's display name.
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Get the table the philosopher sits at.
    pub fn table(&self) -> TableId {
        self.table
    }

    /// Get the seat the philosopher sits in.
    pub fn seat(&self) -> SeatIndex {
        self.seat
    }

    /// Get the left fork.
    pub fn left(&self) -> &Arc<Fork> {
        &self.left
    }

    /// Get the right fork.
    pub fn right(&self) -> &Arc<Fork> {
        &self.right
    }

    /// Get a handle to the published status.
    pub fn status(&self) -> Arc<PhilosopherStatus> {
        self.status.clone()
    }

    /// Spawn the philosopher as a tokio task.
    pub fn spawn(self, events: EventLog, cancel: CancellationToken) -> JoinHandle<PhilosopherExit> {
        tokio::spawn(self.run(events, cancel))
    }

    /// Run the round loop to completion or cancellation.
    pub async fn run(mut self, events: EventLog, cancel: CancellationToken) -> PhilosopherExit {
        match self.run_rounds(&events, &cancel).await {
            Ok(()) => {
                self.status.set_phase(Phase::Finished);
                events.emit(SimEvent::RoundsExhausted {
                    name: self.name.clone(),
                    table: self.table,
                    rounds: self.timing.rounds,
                });
                PhilosopherExit::Finished {
                    rounds: self.timing.rounds,
                }
            }
            Err(Halt::Interrupted) => {
                self.put_down_everything();
                self.status.set_phase(Phase::Interrupted);
                events.emit(SimEvent::Interrupted {
                    name: self.name.clone(),
                    table: self.table,
                });
                PhilosopherExit::Interrupted {
                    rounds_completed: self.status.rounds_completed(),
                }
            }
            Err(Halt::Misuse(err)) => {
                error!(
                    philosopher = %self.name,
                    table = self.table.0,
                    error = %err,
                    "Fork misuse, philosopher stops"
                );
                self.put_down_everything();
                self.status.set_phase(Phase::Interrupted);
                PhilosopherExit::Misuse(err)
            }
        }
    }

    async fn run_rounds(&mut self, events: &EventLog, cancel: &CancellationToken) -> Result<(), Halt> {
        for round in 1..=self.timing.rounds {
            self.run_round(round, events, cancel).await?;
            self.status.complete_round();
        }
        Ok(())
    }

    /// One think/eat cycle. Returns `Ok` whether or not the philosopher ate.
    async fn run_round(
        &mut self,
        round: u32,
        events: &EventLog,
        cancel: &CancellationToken,
    ) -> Result<(), Halt> {
        self.status.set_phase(Phase::Thinking);
        events.emit(SimEvent::Thinking {
            name: self.name.clone(),
            table: self.table,
            round,
        });
        let think = self.timing.think(&mut self.rng);
        pause(think, cancel).await?;

        self.status.set_phase(Phase::Hungry);
        events.emit(SimEvent::Hungry {
            name: self.name.clone(),
            table: self.table,
        });
        if !self.left.try_acquire(self.id) {
            events.emit(SimEvent::LeftForkDenied {
                name: self.name.clone(),
                table: self.table,
            });
            return Ok(());
        }
        self.status.set_holds_left(true);
        self.status.set_phase(Phase::HoldingLeft);
        events.emit(SimEvent::LeftForkAcquired {
            name: self.name.clone(),
            table: self.table,
        });

        pause(self.timing.wait_for_fork, cancel).await?;

        if !self.right.try_acquire(self.id) {
            self.put_down_left()?;
            self.status.set_phase(Phase::Thinking);
            events.emit(SimEvent::RightForkDenied {
                name: self.name.clone(),
                table: self.table,
            });
            return Ok(());
        }
        self.status.set_holds_right(true);
        self.status.set_eating(true);
        self.status.set_phase(Phase::Eating);
        events.emit(SimEvent::Eating {
            name: self.name.clone(),
            table: self.table,
        });

        let eat = self.timing.eat(&mut self.rng);
        pause(eat, cancel).await?;

        self.status.set_eating(false);
        self.put_down_right()?;
        self.put_down_left()?;
        self.status.set_phase(Phase::Thinking);
        events.emit(SimEvent::FinishedEating {
            name: self.name.clone(),
            table: self.table,
        });
        Ok(())
    }

    fn put_down_left(&self) -> Result<(), ForkError> {
        self.left.release(self.id)?;
        self.status.set_holds_left(false);
        Ok(())
    }

    fn put_down_right(&self) -> Result<(), ForkError> {
        self.right.release(self.id)?;
        self.status.set_holds_right(false);
        Ok(())
    }

    /// Put down whatever is still held, right before left.
    fn put_down_everything(&self) {
        self.status.set_eating(false);
        if self.status.holds_right() {
            if let Err(err) = self.put_down_right() {
                error!(philosopher = %self.name, error = %err, "Failed to put down right fork");
            }
        }
        if self.status.holds_left() {
            if let Err(err) = self.put_down_left() {
                error!(philosopher = %self.name, error = %err, "Failed to put down left fork");
            }
        }
        debug!(philosopher = %self.name, seat = self.seat.0, "Put down all forks");
    }
}

/// Sleep for `duration` unless cancelled first.
async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), Halt> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Halt::Interrupted),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symposium_types::ForkId;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tracing_test::traced_test;

    fn fork(index: u32) -> Arc<Fork> {
        Arc::new(Fork::new(ForkId::new(TableId(0), index)))
    }

    fn philosopher(left: Arc<Fork>, right: Arc<Fork>, timing: PhilosopherTiming) -> Philosopher {
        Philosopher::new(
            PhilosopherId(0),
            Arc::from("Philosopher A"),
            (TableId(0), SeatIndex(0)),
            (left, right),
            timing,
            7,
        )
    }

    fn drain(rx: &mut UnboundedReceiver<SimEvent>) -> Vec<SimEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn fast_timing() -> PhilosopherTiming {
        PhilosopherTiming::default()
            .with_thinking_time(Duration::from_millis(100))
            .with_eating_time(Duration::from_millis(50))
            .with_wait_for_fork(Duration::from_millis(20))
    }

    #[traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_uncontended_philosopher_eats_every_round() {
        let (left, right) = (fork(0), fork(1));
        let p = philosopher(left.clone(), right.clone(), fast_timing().with_rounds(25));
        let status = p.status();
        let (events, mut rx) = EventLog::channel();

        let exit = p.run(events, CancellationToken::new()).await;

        assert_eq!(exit, PhilosopherExit::Finished { rounds: 25 });
        assert_eq!(status.rounds_completed(), 25);
        assert_eq!(status.phase(), Phase::Finished);
        assert!(!status.is_eating());
        assert!(!left.is_held());
        assert!(!right.is_held());

        let events = drain(&mut rx);
        let count = |f: fn(&SimEvent) -> bool| events.iter().filter(|e| f(e)).count();
        assert_eq!(count(|e| matches!(e, SimEvent::Thinking { .. })), 25);
        assert_eq!(count(|e| matches!(e, SimEvent::Eating { .. })), 25);
        assert_eq!(count(|e| matches!(e, SimEvent::FinishedEating { .. })), 25);
        assert!(matches!(
            events.last(),
            Some(SimEvent::RoundsExhausted { rounds: 25, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_right_fork_denied_puts_left_down() {
        let (left, right) = (fork(0), fork(1));
        // Neighbour sits on the right fork for the whole run
        assert!(right.try_acquire(PhilosopherId(1)));

        let p = philosopher(left.clone(), right.clone(), fast_timing().with_rounds(3));
        let status = p.status();
        let (events, mut rx) = EventLog::channel();

        let exit = p.run(events, CancellationToken::new()).await;

        assert_eq!(exit, PhilosopherExit::Finished { rounds: 3 });
        assert_eq!(status.rounds_completed(), 3);
        assert!(!left.is_held());
        assert_eq!(right.holder(), Some(PhilosopherId(1)));

        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, SimEvent::Eating { .. })));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SimEvent::RightForkDenied { .. }))
                .count(),
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_left_fork_denied_goes_back_to_thinking() {
        let (left, right) = (fork(0), fork(1));
        assert!(left.try_acquire(PhilosopherId(4)));

        let p = philosopher(left.clone(), right.clone(), fast_timing().with_rounds(2));
        let (events, mut rx) = EventLog::channel();

        p.run(events, CancellationToken::new()).await;

        let events = drain(&mut rx);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SimEvent::LeftForkDenied { .. }))
                .count(),
            2
        );
        assert!(!events
            .iter()
            .any(|e| matches!(e, SimEvent::LeftForkAcquired { .. })));
        assert!(!right.is_held());
        assert_eq!(left.holder(), Some(PhilosopherId(4)));
    }

    #[traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_holding_left_releases_it() {
        let (left, right) = (fork(0), fork(1));
        let timing = fast_timing()
            .with_thinking_time(Duration::ZERO)
            .with_wait_for_fork(Duration::from_secs(60));
        let p = philosopher(left.clone(), right.clone(), timing);
        let status = p.status();
        let cancel = CancellationToken::new();
        let (events, mut rx) = EventLog::channel();

        let handle = p.spawn(events, cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(status.is_waiting_for_right());
        assert_eq!(left.holder(), Some(PhilosopherId(0)));

        cancel.cancel();
        let exit = handle.await.unwrap();

        assert_eq!(exit, PhilosopherExit::Interrupted { rounds_completed: 0 });
        assert_eq!(status.phase(), Phase::Interrupted);
        assert!(!status.holds_left());
        assert!(!left.is_held());
        assert!(matches!(
            drain(&mut rx).last(),
            Some(SimEvent::Interrupted { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_eating_releases_both() {
        let (left, right) = (fork(0), fork(1));
        let timing = fast_timing()
            .with_thinking_time(Duration::ZERO)
            .with_wait_for_fork(Duration::ZERO)
            .with_eating_time(Duration::from_secs(3600));
        let p = philosopher(left.clone(), right.clone(), timing);
        let status = p.status();
        let cancel = CancellationToken::new();

        let handle = p.spawn(EventLog::new(), cancel.clone());

        // Eating lasts at most an hour; it will still be going on here
        // unless the draw came out tiny, so wait until we see it.
        while !status.is_eating() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(status.holds_left() && status.holds_right());
        assert_eq!(left.holder(), Some(PhilosopherId(0)));
        assert_eq!(right.holder(), Some(PhilosopherId(0)));

        cancel.cancel();
        handle.await.unwrap();

        assert!(!status.is_eating());
        assert!(!left.is_held());
        assert!(!right.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eating_implies_both_forks_held() {
        let (left, right) = (fork(0), fork(1));
        let p = philosopher(left.clone(), right.clone(), fast_timing().with_rounds(25));
        let status = p.status();

        let handle = p.spawn(EventLog::new(), CancellationToken::new());

        while !handle.is_finished() {
            if status.is_eating() {
                assert_eq!(left.holder(), Some(PhilosopherId(0)));
                assert_eq!(right.holder(), Some(PhilosopherId(0)));
            }
            tokio::time::sleep(Duration::from_millis(3)).await;
        }
        assert_eq!(handle.await.unwrap(), PhilosopherExit::Finished { rounds: 25 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_stolen_fork_is_reported_as_misuse() {
        let (left, right) = (fork(0), fork(1));
        let timing = fast_timing()
            .with_thinking_time(Duration::ZERO)
            .with_wait_for_fork(Duration::from_secs(10));
        let p = philosopher(left.clone(), right.clone(), timing);

        let handle = p.spawn(EventLog::new(), CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Someone else frees the left fork behind the philosopher's back and
        // sits on the right one, so the philosopher has to put the left down.
        left.release(PhilosopherId(0)).unwrap();
        assert!(left.try_acquire(PhilosopherId(9)));
        assert!(right.try_acquire(PhilosopherId(9)));

        let exit = handle.await.unwrap();
        assert!(matches!(
            exit,
            PhilosopherExit::Misuse(ForkError::NotHeld {
                caller: PhilosopherId(0),
                holder: Some(PhilosopherId(9)),
                ..
            })
        ));
        // The other holder keeps the fork
        assert_eq!(left.holder(), Some(PhilosopherId(9)));
    }
}

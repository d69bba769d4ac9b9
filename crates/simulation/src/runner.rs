//! Simulation coordinator and deadlock monitor.

use crate::{ConfigError, MigrationPolicy, SimulationConfig};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use symposium_core::{EventLog, Philosopher, PhilosopherExit, Seat, SimEvent, Table};
use symposium_deadlock::{DeadlockDetector, Verdict};
use symposium_types::{PhilosopherId, SeatIndex, TableId};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where the monitor is in its scan.
///
/// ```text
/// Scanning ──► DeadlockDetected ──► Migrating ──► Scanning
///                                       │
///                                       └──► Halted (overflow deadlocked)
/// ```
///
/// [`SimulationRunner::step`] passes through every state within one call;
/// each change is logged at `debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Checking tables.
    Scanning,
    /// The signature matched at this table.
    DeadlockDetected(TableId),
    /// Moving a philosopher off this table.
    Migrating(TableId),
    /// The overflow table deadlocked; the simulation is over.
    Halted,
}

/// Why a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// The overflow table matched the deadlock signature.
    OverflowDeadlocked,
    /// Every philosopher task has ended.
    AllFinished,
    /// The run was cancelled from outside.
    Cancelled,
}

impl fmt::Display for SimulationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationOutcome::OverflowDeadlocked => f.write_str("overflow table deadlocked"),
            SimulationOutcome::AllFinished => f.write_str("all philosophers finished"),
            SimulationOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Counters collected by the monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Monitor scans performed.
    pub scans: u64,
    /// Times an active table matched the deadlock signature.
    pub deadlocks_detected: u64,
    /// Philosophers moved to the overflow table.
    pub migrations: u64,
    /// Migrations skipped because the overflow table was full.
    pub migrations_skipped: u64,
}

/// Owns every table and drives the monitor loop.
///
/// The runner is the only writer of seat assignments; philosopher tasks
/// only touch their forks and their own status, and the monitor only reads
/// that status.
pub struct SimulationRunner {
    config: SimulationConfig,
    tables: Vec<Table>,
    detector: DeadlockDetector,
    events: EventLog,
    rng: ChaCha8Rng,
    /// Parent of every philosopher's token.
    cancel: CancellationToken,
    /// Tasks of philosophers that were moved off their table.
    displaced: Vec<JoinHandle<PhilosopherExit>>,
    stats: SimulationStats,
    state: MonitorState,
    started: bool,
}

impl SimulationRunner {
    /// Build every table (active ones and the overflow table), all seats
    /// empty and all forks free. Nothing runs until [`start`](Self::start).
    pub fn new(config: SimulationConfig, events: EventLog) -> Result<Self, ConfigError> {
        config.validate()?;

        let tables = (0..config.total_tables())
            .map(|index| Table::new(TableId(index), config.seats_per_table))
            .collect();

        Ok(Self {
            detector: DeadlockDetector::new(config.detection),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            tables,
            events,
            cancel: CancellationToken::new(),
            displaced: Vec::new(),
            stats: SimulationStats::default(),
            state: MonitorState::Scanning,
            started: false,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    /// Get the configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Get all tables, overflow last.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Get a table by id.
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.index())
    }

    /// Get the overflow table.
    pub fn overflow(&self) -> &Table {
        &self.tables[self.config.overflow_table().index()]
    }

    /// Get the monitor counters.
    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    /// Get the monitor state.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Whether no philosopher task is running any more, seated or displaced.
    pub fn is_finished(&self) -> bool {
        self.started
            && self.tables.iter().all(|table| table.live_count() == 0)
            && self.displaced.iter().all(JoinHandle::is_finished)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Seat and spawn a philosopher at every seat of every active table.
    ///
    /// Must be called from within a tokio runtime. Calling it twice has no
    /// effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let seats = self.config.seats_per_table;
        for index in 0..self.config.active_tables {
            let table_id = TableId(index);
            for seat in (0..seats).map(SeatIndex) {
                let id = PhilosopherId::at(table_id, seat, seats);
                let table = &mut self.tables[table_id.index()];
                let philosopher = Philosopher::new(
                    id,
                    id.display_name().into(),
                    (table_id, seat),
                    table.seat_forks(seat),
                    self.config.timing,
                    philosopher_seed(self.config.seed, id, 0),
                );
                let occupant =
                    Seat::launch(philosopher, self.events.clone(), self.cancel.child_token());
                table.occupy(seat, occupant);
            }
        }

        info!(
            active_tables = self.config.active_tables,
            seats_per_table = seats,
            philosophers = self.config.total_philosophers(),
            detection = %self.config.detection,
            migration = %self.config.migration,
            "Simulation started"
        );
    }

    /// Run the monitor until the overflow table deadlocks, every philosopher
    /// finishes, or `cancel` fires.
    ///
    /// The first scan happens one poll interval after the call. On overflow
    /// deadlock and on cancellation every philosopher is told to stop before
    /// this returns; tables keep their seat assignments for inspection.
    pub async fn run(&mut self, cancel: CancellationToken) -> SimulationOutcome {
        self.start();

        let poll = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(poll_ms = poll.as_millis() as u64, "Deadlock monitor started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Deadlock monitor cancelled");
                    self.halt();
                    return SimulationOutcome::Cancelled;
                }
                _ = ticker.tick() => {
                    if let Some(outcome) = self.step() {
                        info!(%outcome, stats = ?self.stats, "Simulation ended");
                        return outcome;
                    }
                }
            }
        }
    }

    /// Stop every philosopher and wait for all their tasks to end.
    ///
    /// Empties every seat.
    pub async fn shutdown(&mut self) {
        self.halt();

        let mut handles: Vec<JoinHandle<PhilosopherExit>> = self
            .tables
            .iter_mut()
            .flat_map(Table::clear)
            .map(Seat::detach)
            .collect();
        handles.append(&mut self.displaced);

        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "Philosopher task failed");
            }
        }
    }

    /// Tell every philosopher task to stop.
    fn halt(&mut self) {
        self.cancel.cancel();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Monitor
    // ═══════════════════════════════════════════════════════════════════════

    /// Perform one monitor scan over the active tables.
    ///
    /// Returns the outcome if the scan ended the simulation.
    pub fn step(&mut self) -> Option<SimulationOutcome> {
        if self.state == MonitorState::Halted {
            return Some(SimulationOutcome::OverflowDeadlocked);
        }
        self.stats.scans += 1;

        for table_id in (0..self.config.active_tables).map(TableId) {
            self.enter(MonitorState::Scanning);

            let verdict = self.detector.assess_table(&self.tables[table_id.index()]);
            let Verdict::Deadlocked(evidence) = verdict else {
                continue;
            };

            self.enter(MonitorState::DeadlockDetected(table_id));
            self.stats.deadlocks_detected += 1;
            debug!(table = table_id.0, ?evidence, "Deadlock signature matched");
            self.events.emit(SimEvent::DeadlockDetected { table: table_id });

            self.enter(MonitorState::Migrating(table_id));
            self.migrate(table_id);

            if self.overflow_deadlocked() {
                self.enter(MonitorState::Halted);
                self.events.emit(SimEvent::OverflowDeadlocked {
                    table: self.config.overflow_table(),
                });
                self.halt();
                return Some(SimulationOutcome::OverflowDeadlocked);
            }
        }

        self.enter(MonitorState::Scanning);
        if self.is_finished() {
            return Some(SimulationOutcome::AllFinished);
        }
        None
    }

    /// Move the monitor to `next`, logging every change of state.
    fn enter(&mut self, next: MonitorState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Monitor state");
            self.state = next;
        }
    }

    /// Whether the overflow table matches the deadlock signature.
    fn overflow_deadlocked(&self) -> bool {
        self.detector.assess_table(self.overflow()).is_deadlocked()
    }

    /// Move a random philosopher from `from` to the first empty seat of the
    /// overflow table.
    ///
    /// The moved philosopher keeps its id and name and starts over with a
    /// fresh round counter on the overflow table's forks. Its original task
    /// is retired or detached according to the configured
    /// [`MigrationPolicy`]. Returns the overflow seat taken, or `None` if the
    /// overflow table is full or `from` has nobody seated.
    pub fn migrate(&mut self, from: TableId) -> Option<SeatIndex> {
        let overflow_id = self.config.overflow_table();
        if from == overflow_id {
            return None;
        }

        let Some(target) = self.overflow().first_empty_seat() else {
            self.stats.migrations_skipped += 1;
            self.events.emit(SimEvent::MigrationSkipped {
                from,
                overflow: overflow_id,
            });
            return None;
        };

        let source = self.tables.get_mut(from.index())?;
        let live: Vec<SeatIndex> = source
            .occupants()
            .filter(|(_, seat)| seat.is_live())
            .map(|(index, _)| index)
            .collect();
        let candidates = if live.is_empty() {
            source.occupied_seats()
        } else {
            live
        };
        let chosen = *candidates.choose(&mut self.rng)?;
        let moved = source.vacate(chosen)?;

        let id = moved.philosopher();
        let name = moved.name().clone();
        match self.config.migration {
            MigrationPolicy::Retire => self.displaced.push(moved.retire()),
            MigrationPolicy::Detach => self.displaced.push(moved.detach()),
        }

        self.stats.migrations += 1;
        let overflow = &mut self.tables[overflow_id.index()];
        let philosopher = Philosopher::new(
            id,
            name.clone(),
            (overflow_id, target),
            overflow.seat_forks(target),
            self.config.timing,
            philosopher_seed(self.config.seed, id, self.stats.migrations),
        );
        overflow.occupy(
            target,
            Seat::launch(philosopher, self.events.clone(), self.cancel.child_token()),
        );

        debug!(
            philosopher = %name,
            from = from.0,
            from_seat = chosen.0,
            to_seat = target.0,
            policy = %self.config.migration,
            "Migrated philosopher"
        );
        self.events.emit(SimEvent::PhilosopherMoved {
            name,
            from,
            to: overflow_id,
            seat: target,
        });
        Some(target)
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Seed for one philosopher's RNG stream.
///
/// `generation` is 0 at startup and the migration count afterwards, so a
/// migrated philosopher does not replay its old draws.
fn philosopher_seed(seed: u64, id: PhilosopherId, generation: u64) -> u64 {
    seed ^ u64::from(id.0).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ generation.rotate_left(32)
}

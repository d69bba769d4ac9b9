//! Binary mutual-exclusion resource with non-blocking acquisition.

use crate::ForkError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use symposium_types::{ForkId, PhilosopherId};

/// Holder word value for a free fork.
const FREE: u64 = 0;

/// A fork shared by two neighbouring seats.
///
/// The holder is a single atomic word, so acquisition is one compare-and-swap:
/// it either succeeds immediately or fails immediately. There is no queue and
/// no blocking; a failed attempt is simply abandoned by the caller.
pub struct Fork {
    id: ForkId,
    /// `FREE`, or the holder's id plus one.
    holder: AtomicU64,
    /// Number of successful acquisitions over the fork's lifetime.
    acquisitions: AtomicU64,
}

impl Fork {
    /// Create a free fork.
    pub fn new(id: ForkId) -> Self {
        Self {
            id,
            holder: AtomicU64::new(FREE),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Get the fork's identifier.
    pub fn id(&self) -> ForkId {
        self.id
    }

    /// Try to take the fork for `by` without blocking.
    ///
    /// Returns `true` iff the fork was free at the attempt. A fork already
    /// held, including by `by` itself, is not taken again.
    pub fn try_acquire(&self, by: PhilosopherId) -> bool {
        let taken = self
            .holder
            .compare_exchange(FREE, encode(by), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if taken {
            self.acquisitions.fetch_add(1, Ordering::Relaxed);
        }
        taken
    }

    /// Put the fork down.
    ///
    /// Fails with [`ForkError::NotHeld`] unless `by` currently holds the fork;
    /// in that case the fork is left untouched.
    pub fn release(&self, by: PhilosopherId) -> Result<(), ForkError> {
        self.holder
            .compare_exchange(encode(by), FREE, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| ForkError::NotHeld {
                fork: self.id,
                caller: by,
                holder: decode(current),
            })
    }

    /// Who holds the fork right now, if anyone.
    pub fn holder(&self) -> Option<PhilosopherId> {
        decode(self.holder.load(Ordering::Acquire))
    }

    /// Whether the fork is held right now.
    pub fn is_held(&self) -> bool {
        self.holder.load(Ordering::Acquire) != FREE
    }

    /// Number of successful acquisitions so far.
    ///
    /// Two observations with the same holder and the same count belong to the
    /// same uninterrupted hold.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fork")
            .field("id", &self.id)
            .field("holder", &self.holder())
            .field("acquisitions", &self.acquisitions())
            .finish()
    }
}

fn encode(philosopher: PhilosopherId) -> u64 {
    u64::from(philosopher.0) + 1
}

fn decode(word: u64) -> Option<PhilosopherId> {
    // Holder words are only ever written by `encode`, so they fit in a u32.
    word.checked_sub(1).map(|id| PhilosopherId(id as u32))
}

//! Philosopher timing parameters.

use rand::Rng;
use std::time::Duration;

/// How long a philosopher thinks, eats and waits, and for how many rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhilosopherTiming {
    /// Upper bound (exclusive) of a thinking period.
    pub thinking_time: Duration,

    /// Upper bound (exclusive) of an eating period.
    pub eating_time: Duration,

    /// Fixed pause between taking the left fork and trying the right one.
    ///
    /// The pause widens the window in which every philosopher at a table can
    /// hold its left fork at once.
    pub wait_for_fork: Duration,

    /// Number of think/eat cycles before the philosopher stops.
    pub rounds: u32,
}

impl Default for PhilosopherTiming {
    fn default() -> Self {
        Self {
            thinking_time: Duration::from_secs(10),
            eating_time: Duration::from_secs(5),
            wait_for_fork: Duration::from_secs(4),
            rounds: 25,
        }
    }
}

impl PhilosopherTiming {
    /// Set the thinking time bound.
    pub fn with_thinking_time(mut self, thinking_time: Duration) -> Self {
        self.thinking_time = thinking_time;
        self
    }

    /// Set the eating time bound.
    pub fn with_eating_time(mut self, eating_time: Duration) -> Self {
        self.eating_time = eating_time;
        self
    }

    /// Set the pause between the left and right fork.
    pub fn with_wait_for_fork(mut self, wait_for_fork: Duration) -> Self {
        self.wait_for_fork = wait_for_fork;
        self
    }

    /// Set the round budget.
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    /// Draw a thinking period in `[0, thinking_time)`.
    pub fn think(&self, rng: &mut impl Rng) -> Duration {
        sample_below(self.thinking_time, rng)
    }

    /// Draw an eating period in `[0, eating_time)`.
    pub fn eat(&self, rng: &mut impl Rng) -> Duration {
        sample_below(self.eating_time, rng)
    }

    /// Longest time a single acquisition can keep a fork held.
    pub fn max_hold(&self) -> Duration {
        self.wait_for_fork + self.eating_time
    }
}

/// Uniform duration in `[0, bound)`; a zero bound always yields zero.
fn sample_below(bound: Duration, rng: &mut impl Rng) -> Duration {
    if bound.is_zero() {
        return Duration::ZERO;
    }
    rng.gen_range(Duration::ZERO..bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_defaults() {
        let timing = PhilosopherTiming::default();
        assert_eq!(timing.thinking_time, Duration::from_secs(10));
        assert_eq!(timing.eating_time, Duration::from_secs(5));
        assert_eq!(timing.wait_for_fork, Duration::from_secs(4));
        assert_eq!(timing.rounds, 25);
        assert_eq!(timing.max_hold(), Duration::from_secs(9));
    }

    #[test]
    fn test_samples_stay_below_bound() {
        let timing = PhilosopherTiming::default()
            .with_thinking_time(Duration::from_millis(300))
            .with_eating_time(Duration::from_millis(7));
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..1_000 {
            assert!(timing.think(&mut rng) < Duration::from_millis(300));
            assert!(timing.eat(&mut rng) < Duration::from_millis(7));
        }
    }

    #[test]
    fn test_zero_bound_yields_zero() {
        let timing = PhilosopherTiming::default()
            .with_thinking_time(Duration::ZERO)
            .with_eating_time(Duration::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert_eq!(timing.think(&mut rng), Duration::ZERO);
        assert_eq!(timing.eat(&mut rng), Duration::ZERO);
    }
}

//! Config file loading and command-line overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symposium_core::PhilosopherTiming;
use symposium_deadlock::DetectionMode;
use symposium_simulation::{MigrationPolicy, SimulationConfig};
use thiserror::Error;

/// Failure to load a config file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Philosopher timing as written in a config file. Durations in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSection {
    pub thinking_ms: Option<u64>,
    pub eating_ms: Option<u64>,
    pub wait_for_fork_ms: Option<u64>,
    pub rounds: Option<u32>,
}

impl TimingSection {
    /// Fill unset fields from `fallback`.
    fn or(self, fallback: TimingSection) -> TimingSection {
        TimingSection {
            thinking_ms: self.thinking_ms.or(fallback.thinking_ms),
            eating_ms: self.eating_ms.or(fallback.eating_ms),
            wait_for_fork_ms: self.wait_for_fork_ms.or(fallback.wait_for_fork_ms),
            rounds: self.rounds.or(fallback.rounds),
        }
    }

    fn apply(&self, mut timing: PhilosopherTiming) -> PhilosopherTiming {
        if let Some(ms) = self.thinking_ms {
            timing = timing.with_thinking_time(Duration::from_millis(ms));
        }
        if let Some(ms) = self.eating_ms {
            timing = timing.with_eating_time(Duration::from_millis(ms));
        }
        if let Some(ms) = self.wait_for_fork_ms {
            timing = timing.with_wait_for_fork(Duration::from_millis(ms));
        }
        if let Some(rounds) = self.rounds {
            timing = timing.with_rounds(rounds);
        }
        timing
    }
}

/// Partial simulation settings, from a config file or the command line.
///
/// Every field is optional. Unset fields keep the [`SimulationConfig`]
/// defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub active_tables: Option<u32>,
    pub seats_per_table: Option<u32>,
    pub poll_interval_ms: Option<u64>,
    pub detection: Option<DetectionMode>,
    pub migration: Option<MigrationPolicy>,
    pub seed: Option<u64>,
    pub timing: TimingSection,
}

impl FileConfig {
    /// Load settings from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `overrides` on top of these settings; set fields in
    /// `overrides` win.
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        FileConfig {
            active_tables: overrides.active_tables.or(self.active_tables),
            seats_per_table: overrides.seats_per_table.or(self.seats_per_table),
            poll_interval_ms: overrides.poll_interval_ms.or(self.poll_interval_ms),
            detection: overrides.detection.or(self.detection),
            migration: overrides.migration.or(self.migration),
            seed: overrides.seed.or(self.seed),
            timing: overrides.timing.or(self.timing),
        }
    }

    /// Resolve into a full configuration. Not validated.
    pub fn into_simulation_config(self) -> SimulationConfig {
        let defaults = SimulationConfig::default();
        let mut config = SimulationConfig::new(
            self.active_tables.unwrap_or(defaults.active_tables),
            self.seats_per_table.unwrap_or(defaults.seats_per_table),
        )
        .with_timing(self.timing.apply(defaults.timing));

        if let Some(ms) = self.poll_interval_ms {
            config = config.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(detection) = self.detection {
            config = config.with_detection(detection);
        }
        if let Some(migration) = self.migration {
            config = config.with_migration(migration);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let file: FileConfig = toml::from_str("").unwrap();
        assert_eq!(file, FileConfig::default());

        let config = file.into_simulation_config();
        assert_eq!(config.active_tables, 5);
        assert_eq!(config.seats_per_table, 5);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.timing.thinking_time, Duration::from_secs(10));
        assert_eq!(config.timing.rounds, 25);
        assert_eq!(config.detection, DetectionMode::NoneEating);
        assert_eq!(config.migration, MigrationPolicy::Retire);
    }

    #[test]
    fn test_parse_full_file() {
        let file: FileConfig = toml::from_str(
            r#"
            active_tables = 3
            seats_per_table = 7
            poll_interval_ms = 250
            detection = "wait-for-graph"
            migration = "detach"
            seed = 99

            [timing]
            thinking_ms = 0
            eating_ms = 1500
            wait_for_fork_ms = 30000
            rounds = 10
            "#,
        )
        .unwrap();

        let config = file.into_simulation_config();
        assert_eq!(config.active_tables, 3);
        assert_eq!(config.seats_per_table, 7);
        assert_eq!(config.overflow_table().0, 3);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.detection, DetectionMode::WaitForGraph);
        assert_eq!(config.migration, MigrationPolicy::Detach);
        assert_eq!(config.seed, 99);
        assert_eq!(config.timing.thinking_time, Duration::ZERO);
        assert_eq!(config.timing.eating_time, Duration::from_millis(1500));
        assert_eq!(config.timing.wait_for_fork, Duration::from_secs(30));
        assert_eq!(config.timing.rounds, 10);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(toml::from_str::<FileConfig>("tables = 3").is_err());
        assert!(toml::from_str::<FileConfig>("detection = \"sometimes\"").is_err());
    }

    #[test]
    fn test_overrides_win_field_by_field() {
        let file: FileConfig = toml::from_str(
            r#"
            active_tables = 3
            seed = 1
            [timing]
            eating_ms = 100
            rounds = 4
            "#,
        )
        .unwrap();
        let cli = FileConfig {
            seed: Some(2),
            timing: TimingSection {
                rounds: Some(8),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = file.merge(cli).into_simulation_config();
        assert_eq!(config.active_tables, 3);
        assert_eq!(config.seed, 2);
        assert_eq!(config.timing.eating_time, Duration::from_millis(100));
        assert_eq!(config.timing.rounds, 8);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = FileConfig::from_toml_file(Path::new("/nonexistent/symposium.toml")).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/symposium.toml"));
    }
}

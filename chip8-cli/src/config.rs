//! Run configuration
use std::{fs, path::Path};

use chip8::KeyCode;
use serde::Deserialize;

use crate::{clock::Hz, error::AppError};

const DEFAULT_CYCLES: u64 = 10_000;

/// Parameters of the driving loop, loaded from a YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Cycles per second. Absent or zero runs as fast as possible.
    pub clock_frequency: Option<Hz>,
    /// Maximum number of cycles to execute.
    pub cycles: u64,
    /// Seed for the random number generator, for reproducible runs.
    pub seed: Option<u64>,
    /// Stop once the program jumps to itself.
    pub stop_on_spin: bool,
    /// Scripted keypad input.
    pub keys: Vec<KeyPress>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            clock_frequency: None,
            cycles: DEFAULT_CYCLES,
            seed: None,
            stop_on_spin: true,
            keys: Vec::new(),
        }
    }
}

/// A key held down for a span of cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct KeyPress {
    pub key: KeyCode,
    /// Cycle on which the key goes down.
    pub at: u64,
    /// Number of cycles the key stays down.
    #[serde(default = "KeyPress::default_hold")]
    pub hold: u64,
}

impl KeyPress {
    fn default_hold() -> u64 {
        1
    }

    /// Whether the key is down during the given cycle.
    pub fn is_down(&self, cycle: u64) -> bool {
        cycle >= self.at && cycle - self.at < self.hold
    }
}

impl RunConfig {
    pub fn from_file(filepath: impl AsRef<Path>) -> Result<Self, AppError> {
        let source = fs::read_to_string(filepath)?;
        let config = Self::from_yaml(&source)?;
        log::debug!("loaded run configuration: {:#?}", config);
        Ok(config)
    }

    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.cycles, DEFAULT_CYCLES);
        assert!(config.stop_on_spin);
        assert!(config.keys.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = RunConfig::from_yaml(
            r#"
clock_frequency: 500
cycles: 200
seed: 7
stop_on_spin: false
keys:
  - { key: 5, at: 10, hold: 3 }
  - { key: 15, at: 40 }
"#,
        )
        .unwrap();

        assert_eq!(config.clock_frequency, Some(Hz(500)));
        assert_eq!(config.cycles, 200);
        assert_eq!(config.seed, Some(7));
        assert!(!config.stop_on_spin);
        assert_eq!(
            config.keys,
            vec![
                KeyPress {
                    key: KeyCode::Key5,
                    at: 10,
                    hold: 3
                },
                KeyPress {
                    key: KeyCode::KeyF,
                    at: 40,
                    hold: 1
                },
            ]
        );
    }

    #[test]
    fn test_invalid_key() {
        assert!(RunConfig::from_yaml("keys: [{ key: 16, at: 0 }]").is_err());
    }

    #[test]
    fn test_key_press_span() {
        let press = KeyPress {
            key: KeyCode::Key1,
            at: 4,
            hold: 2,
        };
        assert!(!press.is_down(3));
        assert!(press.is_down(4));
        assert!(press.is_down(5));
        assert!(!press.is_down(6));
    }
}

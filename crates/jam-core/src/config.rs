//! Bridge configuration.

use crate::timing::{DEFAULT_BEATS_PER_MINUTE, DEFAULT_TICKS_PER_BEAT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings a bridge is constructed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Prefix of every console line this bridge posts.
    pub name: String,
    /// Initial resolution in ticks per beat.
    pub ticks_per_beat: f64,
    /// Initial tempo in beats per minute.
    pub beats_per_minute: f64,
    /// Maximum interpreter operations per handler call.
    pub max_operations: u64,
    /// Maximum script function call depth.
    pub max_call_levels: usize,
    /// Maximum expression nesting depth.
    pub max_expr_depth: usize,
    /// Module search directories, after the directories of loaded scripts.
    pub search_path: Vec<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: "jam".to_string(),
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            beats_per_minute: DEFAULT_BEATS_PER_MINUTE,
            max_operations: 500_000,
            max_call_levels: 64,
            max_expr_depth: 256,
            search_path: vec![PathBuf::from("."), PathBuf::from("./lib")],
        }
    }
}

impl BridgeConfig {
    /// Override the initial tempo settings.
    pub fn with_tempo(mut self, ticks_per_beat: f64, beats_per_minute: f64) -> Self {
        self.ticks_per_beat = ticks_per_beat;
        self.beats_per_minute = beats_per_minute;
        self
    }

    /// Append a directory to the module search path.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_path.push(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.name, "jam");
        assert!((config.ticks_per_beat - 180.0).abs() < 0.001);
        assert!((config.beats_per_minute - 100.0).abs() < 0.001);
        assert_eq!(config.search_path.len(), 2);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: BridgeConfig = toml::from_str("beats_per_minute = 128.0\nname = \"drums\"").unwrap();
        assert_eq!(config.name, "drums");
        assert!((config.beats_per_minute - 128.0).abs() < 0.001);
        assert!((config.ticks_per_beat - 180.0).abs() < 0.001);
        assert_eq!(config.max_operations, 500_000);
    }

    #[test]
    fn test_builders() {
        let config = BridgeConfig::default()
            .with_tempo(4.0, 120.0)
            .with_search_dir("/usr/share/jam");
        assert!((config.ticks_per_beat - 4.0).abs() < 0.001);
        assert_eq!(config.search_path.last(), Some(&PathBuf::from("/usr/share/jam")));
    }
}

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

pub const DEFAULT_LOG_NAME: &str = "handover_dataset.csv";

/// Tunables for the sampler. Every field has a default so a partial JSON file
/// only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggerSettings {
    pub log_path: PathBuf,
    pub normal_interval_ms: u64,
    pub focus_interval_ms: u64,
    /// How long the fast cadence lasts after a confirmed handover.
    pub focus_window_ms: u64,
    pub ping_target: String,
    pub ping_count: u32,
    pub shutdown_grace_ms: u64,
    /// Poll period of the host network monitor.
    pub poll_interval_ms: u64,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_NAME),
            normal_interval_ms: 2_000,
            focus_interval_ms: 500,
            focus_window_ms: 5_000,
            ping_target: "8.8.8.8".into(),
            ping_count: 50,
            shutdown_grace_ms: 3_000,
            poll_interval_ms: 1_000,
        }
    }
}

impl LoggerSettings {
    /// Loads settings from `path`. A missing file yields defaults; a file that
    /// does not parse also yields defaults, with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(
                "Ignoring malformed settings file {}: {err}; using defaults",
                path.display()
            );
            Self::default()
        }))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn normal_interval(&self) -> Duration {
        Duration::from_millis(self.normal_interval_ms)
    }

    pub fn focus_interval(&self) -> Duration {
        Duration::from_millis(self.focus_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggerSettings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, LoggerSettings::default());
        assert_eq!(settings.focus_window_ms, 5_000);
        assert_eq!(settings.ping_count, 50);
    }

    #[test]
    fn partial_file_overrides_named_fields_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "ping_count": 5, "ping_target": "1.1.1.1" }"#).unwrap();

        let settings = LoggerSettings::load(&path).unwrap();
        assert_eq!(settings.ping_count, 5);
        assert_eq!(settings.ping_target, "1.1.1.1");
        assert_eq!(settings.normal_interval_ms, 2_000);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        assert_eq!(LoggerSettings::load(&path).unwrap(), LoggerSettings::default());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = LoggerSettings {
            focus_interval_ms: 250,
            ..LoggerSettings::default()
        };
        settings.save(&path).unwrap();

        assert_eq!(LoggerSettings::load(&path).unwrap().focus_interval_ms, 250);
    }
}

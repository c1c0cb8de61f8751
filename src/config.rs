use std::{io::ErrorKind, path::Path};

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    timer::countdown::DEFAULT_MINUTES,
    tracker::{
        accumulator::GAP_TOLERANCE, aggregate::DEFAULT_MIN_SLOT_SHARE, quantize::Unit,
    },
};

pub const SETTINGS_FILE: &str = "settings.json";

/// Tunables read from `<app>/settings.json`. Missing fields take their defaults, so the file
/// only has to mention what differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Quantization unit applied before saving and displaying.
    pub unit_seconds: u32,
    /// Pause after which ticks of the same category start a new session.
    pub gap_tolerance_ms: u32,
    /// A day grid slot is painted when a category covers more than this.
    pub slot_min_share_seconds: u32,
    pub default_minutes: u32,
    /// How often a running timer saves its log.
    pub autosave_seconds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            unit_seconds: Unit::TEN_MINUTES.num_seconds() as u32,
            gap_tolerance_ms: GAP_TOLERANCE.num_milliseconds() as u32,
            slot_min_share_seconds: DEFAULT_MIN_SLOT_SHARE.num_seconds() as u32,
            default_minutes: DEFAULT_MINUTES,
            autosave_seconds: 60,
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                serde_json::from_str(&contents).with_context(|| format!("Invalid settings {path:?}"))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings at {path:?}, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("Can't read settings {path:?}")),
        }
    }

    pub fn unit(&self) -> Result<Unit> {
        Unit::from_seconds(self.unit_seconds.into())
            .ok_or_else(|| anyhow!("unit_seconds has to be positive"))
    }

    pub fn gap_tolerance(&self) -> Duration {
        Duration::milliseconds(self.gap_tolerance_ms.into())
    }

    pub fn slot_min_share(&self) -> Duration {
        Duration::seconds(self.slot_min_share_seconds.into())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::seconds(self.autosave_seconds.into())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::Settings;

    #[test]
    fn missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let settings = Settings::load(&dir.path().join("settings.json"))?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.unit()?.num_seconds(), 600);
        assert_eq!(settings.gap_tolerance().num_milliseconds(), 1500);
        assert_eq!(settings.slot_min_share().num_seconds(), 180);
        assert_eq!(settings.default_minutes, 25);
        Ok(())
    }

    #[test]
    fn partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "unit_seconds": 300 }"#)?;

        let settings = Settings::load(&path)?;
        assert_eq!(settings.unit()?.num_seconds(), 300);
        assert_eq!(settings.autosave_seconds, 60);
        Ok(())
    }

    #[test]
    fn zero_unit_is_rejected() {
        let settings = Settings {
            unit_seconds: 0,
            ..Default::default()
        };
        assert!(settings.unit().is_err());
    }
}

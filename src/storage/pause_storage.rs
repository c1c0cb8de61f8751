use std::{io::ErrorKind, path::PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{timer::countdown::Countdown, tracker::entities::CategoryId};

/// A round stopped before its countdown ran out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PausedRound {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub category: CategoryId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub paused_at: DateTime<Utc>,
}

impl PausedRound {
    pub fn new(countdown: Countdown, category: CategoryId, paused_at: DateTime<Utc>) -> Self {
        Self {
            total_seconds: countdown.total(),
            remaining_seconds: countdown.remaining(),
            category,
            paused_at,
        }
    }

    /// Countdown to continue with. None when the stored numbers make no sense.
    pub fn countdown(&self) -> Option<Countdown> {
        Countdown::resume(self.total_seconds, self.remaining_seconds)
    }
}

/// Keeps at most one [PausedRound] in a json file.
#[derive(Debug, Clone)]
pub struct PauseStore {
    path: PathBuf,
}

impl PauseStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// A paused round file that can't be parsed is reported and treated as missing.
    pub fn load(&self) -> Result<Option<PausedRound>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(round) => Ok(Some(round)),
                Err(e) => {
                    warn!("Ignoring corrupted paused round {:?}: {e}", self.path);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Nothing paused at {:?}", self.path);
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Can't read paused round {:?}", self.path)),
        }
    }

    pub fn save(&self, round: &PausedRound) -> Result<()> {
        let temporary = self.path.with_extension("json.tmp");
        std::fs::write(&temporary, serde_json::to_vec_pretty(round)?)
            .with_context(|| format!("Can't write {temporary:?}"))?;
        std::fs::rename(&temporary, &self.path)
            .with_context(|| format!("Can't replace {:?}", self.path))?;
        info!("Paused round saved with {}s left", round.remaining_seconds);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared paused round");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Can't remove {:?}", self.path)),
        }
    }
}

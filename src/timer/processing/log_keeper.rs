use anyhow::{bail, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tracing::{error, info, warn};

use crate::{
    storage::log_storage::LogStorage,
    tracker::{
        accumulator::{merge_logs, record_tick_with, TickOutcome, TICK},
        entities::{DayLog, TickEvent},
        quantize::{sanitize, Unit},
    },
    utils::time::{day_bounds, local_date},
};

use super::module::TickProcessor;

/// Bridges ticks and [LogStorage].
///
/// The log loaded for the day and the ticks recorded since are kept apart. Every save merges
/// them, quantizes the result and stores it, the raw ticks themselves are never quantized. Ticks
/// are assigned to days in `tz`.
pub struct LogKeeper<S: LogStorage, Tz: TimeZone> {
    storage: S,
    tz: Tz,
    unit: Unit,
    gap_tolerance: Duration,
    autosave: Duration,
    day: Option<OpenDay>,
}

struct OpenDay {
    date: NaiveDate,
    /// Start of the next day. Nothing recorded for this day reaches past it.
    end: DateTime<Utc>,
    stored: DayLog,
    live: DayLog,
    /// False when the stored log couldn't be read. Saving then would overwrite it.
    writable: bool,
    last_save: DateTime<Utc>,
}

impl<S: LogStorage, Tz: TimeZone> LogKeeper<S, Tz> {
    pub fn new(storage: S, tz: Tz, unit: Unit, gap_tolerance: Duration, autosave: Duration) -> Self {
        Self {
            storage,
            tz,
            unit,
            gap_tolerance,
            autosave,
            day: None,
        }
    }

    /// What the log of the current day looks like with everything recorded so far, before
    /// quantization.
    pub fn current_log(&self) -> Option<DayLog> {
        self.day
            .as_ref()
            .map(|day| merge_logs(day.stored.clone(), day.live.clone(), self.gap_tolerance))
    }

    /// Day a tick belongs to. The tick at `t` stands for the second before it, so the tick at
    /// midnight still closes the previous day.
    fn day_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        local_date(timestamp - TICK, &self.tz)
    }

    async fn open_day(&self, date: NaiveDate, now: DateTime<Utc>) -> OpenDay {
        let (stored, writable) = match self.storage.load_day_log(date).await {
            Ok(log) => (log, true),
            Err(e) => {
                error!("Can't load the log of {date}, it won't be saved: {e:?}");
                (DayLog::default(), false)
            }
        };
        info!("Opened {date} with {} stored sessions", stored.sessions.len());
        let (_, end) = day_bounds(date, &self.tz);
        OpenDay {
            date,
            end,
            stored,
            live: DayLog::default(),
            writable,
            last_save: now,
        }
    }

    async fn save(&mut self) -> Result<()> {
        let Some(day) = self.day.as_ref() else {
            return Ok(());
        };
        if !day.writable {
            bail!("Refusing to overwrite the unreadable log of {}", day.date);
        }

        let merged = merge_logs(day.stored.clone(), day.live.clone(), self.gap_tolerance);
        let unit = self.unit;
        let saved = self
            .storage
            .update_day_log(day.date, move |stored| {
                let mut merged = merged;
                // The note might have been edited while the timer was running.
                merged.note = std::mem::take(&mut stored.note);
                *stored = sanitize(&merged, unit);
            })
            .await?;

        info!("Saved {} with {} sessions", day.date, saved.sessions.len());
        Ok(())
    }

    async fn save_logged(&mut self) {
        if let Err(e) = self.save().await {
            // Not retried, the next save carries everything anyway.
            warn!("Saving the day log failed {e:?}");
        }
    }
}

impl<S: LogStorage, Tz: TimeZone> TickProcessor for LogKeeper<S, Tz> {
    async fn process_next(&mut self, tick: &TickEvent) -> Result<TickOutcome> {
        let date = self.day_of(tick.timestamp);

        let open_date = self.day.as_ref().map(|day| day.date);
        if open_date != Some(date) {
            if open_date.is_some() {
                self.save_logged().await;
            }
            self.day = Some(self.open_day(date, tick.timestamp).await);
        }

        let Some(day) = self.day.as_mut() else {
            return Ok(TickOutcome::Ignored);
        };
        // Ticks a little late around midnight still end with their day.
        let moment = tick.timestamp.min(day.end);
        let outcome = record_tick_with(&mut day.live, &tick.category, moment, self.gap_tolerance);

        if tick.timestamp - day.last_save >= self.autosave {
            day.last_save = tick.timestamp;
            self.save_logged().await;
        }
        Ok(outcome)
    }

    async fn finalize(&mut self) -> Result<()> {
        self.save().await
    }
}

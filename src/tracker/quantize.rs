use chrono::Duration;

use super::{entities::DayLog, totals::Totals};

/// Bucket size used for quantizing sessions. Always a positive whole number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit(Duration);

impl Unit {
    pub const TEN_MINUTES: Unit = Unit(Duration::seconds(600));

    pub fn from_seconds(seconds: i64) -> Option<Self> {
        if seconds > 0 {
            Some(Self(Duration::seconds(seconds)))
        } else {
            None
        }
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn num_seconds(&self) -> i64 {
        self.0.num_seconds()
    }

    /// Largest multiple of the unit that fits into `duration`. Negative durations floor to zero.
    pub fn floor(&self, duration: Duration) -> Duration {
        let unit_ms = self.0.num_milliseconds();
        let ms = duration.num_milliseconds().max(0);
        Duration::milliseconds(ms / unit_ms * unit_ms)
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::TEN_MINUTES
    }
}

/// Quantizes a day log for saving and display.
///
/// Sessions shorter than `unit` are treated as noise and dropped. The rest are cut down to a
/// multiple of `unit` (`end = start + floor(duration)`), and totals are rebuilt from what's left.
/// The remainder is discarded, not carried over. Applying it to its own output changes nothing.
pub fn sanitize(log: &DayLog, unit: Unit) -> DayLog {
    let sessions = log
        .sessions
        .iter()
        .filter(|session| session.duration() >= unit.as_duration())
        .map(|session| {
            let floored = unit.floor(session.duration());
            session.clone().with_end(session.start + floored)
        })
        .collect::<Vec<_>>();

    let totals = sessions
        .iter()
        .map(|session| (session.category_id.clone(), session.duration().num_seconds()))
        .collect::<Totals>();

    DayLog {
        sessions,
        totals,
        note: log.note.clone(),
    }
}

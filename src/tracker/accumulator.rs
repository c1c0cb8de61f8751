use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use super::entities::{Category, DayLog, Session};

/// Largest pause between two ticks of the same category that still counts as one session.
/// Ticks arrive every second, so this leaves half a second of jitter.
pub const GAP_TOLERANCE: Duration = Duration::milliseconds(1500);

/// Every tick accounts for this many seconds of focus.
pub const TICK_SECONDS: i64 = 1;

/// Span covered by a single tick. A tick is emitted once its second has elapsed, so the tick at
/// `t` covers `[t - TICK, t]`.
pub const TICK: Duration = Duration::seconds(TICK_SECONDS);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new session was opened.
    Started,
    /// The last session was extended.
    Extended,
    /// The tick was dropped and the log is unchanged.
    Ignored,
}

/// Records one tick with the default [GAP_TOLERANCE].
pub fn record_tick(log: &mut DayLog, category: &Category, timestamp: DateTime<Utc>) -> TickOutcome {
    record_tick_with(log, category, timestamp, GAP_TOLERANCE)
}

/// Attributes one second at `timestamp` to `category`.
///
/// The last session is extended to `timestamp` when it belongs to the same category and the
/// pause since its end is shorter than `gap_tolerance`. Otherwise a new session covering the
/// elapsed second is opened; its start never reaches back past the end of the previous session.
/// Closed sessions are never touched again. A tick older than the end of the last session is
/// ignored, as is a tick without a category id.
pub fn record_tick_with(
    log: &mut DayLog,
    category: &Category,
    timestamp: DateTime<Utc>,
    gap_tolerance: Duration,
) -> TickOutcome {
    if category.id.is_missing() {
        trace!("Ignoring tick at {timestamp} without a category");
        return TickOutcome::Ignored;
    }

    let previous_end = log.sessions.last().map(|session| session.end);

    let outcome = match log.sessions.last_mut() {
        Some(last) if timestamp < last.end => {
            debug!(
                "Ignoring tick at {timestamp}, it's older than the last session end {}",
                last.end
            );
            return TickOutcome::Ignored;
        }
        Some(last) if last.category_id == category.id && timestamp - last.end < gap_tolerance => {
            last.end = timestamp;
            // Renames and recolors made while the timer runs show up right away.
            last.category_name = category.name.clone();
            last.category_color = category.color;
            TickOutcome::Extended
        }
        Some(_) | None => {
            let start = previous_end.map_or(timestamp - TICK, |end| end.max(timestamp - TICK));
            log.sessions
                .push(Session::starting_at(category, start).with_end(timestamp));
            TickOutcome::Started
        }
    };

    log.totals.add(&category.id, TICK_SECONDS);
    outcome
}

/// Combines a log loaded from storage with one recorded since. Sessions are ordered by start,
/// neighbours of the same category closer than `gap_tolerance` are joined, totals are summed.
/// The note of `live` wins when it has one.
pub fn merge_logs(stored: DayLog, live: DayLog, gap_tolerance: Duration) -> DayLog {
    let mut sessions = stored.sessions;
    sessions.extend(live.sessions);
    sessions.sort_by_key(|session| session.start);

    let mut merged: Vec<Session> = Vec::with_capacity(sessions.len());
    for session in sessions {
        match merged.last_mut() {
            Some(last)
                if last.category_id == session.category_id
                    && session.start - last.end < gap_tolerance =>
            {
                if session.end > last.end {
                    last.end = session.end;
                    last.category_name = session.category_name;
                    last.category_color = session.category_color;
                }
            }
            Some(_) | None => merged.push(session),
        }
    }

    let mut totals = stored.totals;
    for (id, seconds) in live.totals.iter() {
        totals.add(id, seconds);
    }

    DayLog {
        sessions: merged,
        totals,
        note: if live.note.is_null() {
            stored.note
        } else {
            live.note
        },
    }
}

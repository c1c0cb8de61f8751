use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::{
    entities::{CategoryId, Color, DayLog, Session},
    totals::Totals,
};

/// Length of a slot in the day grid.
pub const SLOT_LENGTH: Duration = Duration::seconds(600);

/// A slot is painted only when one category covers more than this much of it.
pub const DEFAULT_MIN_SLOT_SHARE: Duration = Duration::seconds(180);

/// Returns the category with the largest total. On a tie the category that comes first in
/// insertion order wins.
pub fn dominant_category(totals: &Totals) -> Option<&CategoryId> {
    let mut best: Option<(&CategoryId, i64)> = None;
    for (id, seconds) in totals.iter() {
        match best {
            Some((_, max)) if seconds <= max => {}
            Some(_) | None => best = Some((id, seconds)),
        }
    }
    best.map(|(id, _)| id)
}

/// How much of a slot went to a single category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotShare {
    pub category_id: CategoryId,
    /// Snapshot taken from the latest session of the category inside the slot.
    pub category_name: Arc<str>,
    pub category_color: Color,
    pub duration: Duration,
}

impl SlotShare {
    fn new(session: &Session, duration: Duration) -> Self {
        Self {
            category_id: session.category_id.clone(),
            category_name: session.category_name.clone(),
            category_color: session.category_color,
            duration,
        }
    }
}

/// Finds the category that occupied most of `[slot_start, slot_end)`.
///
/// Overlaps of sessions of the same category are summed. The winner is reported only if its
/// share is strictly greater than `min_share`. Ties go to the category encountered first.
pub fn slot_aggregate<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    min_share: Duration,
) -> Option<SlotShare> {
    let mut shares: Vec<SlotShare> = vec![];
    for session in sessions {
        let overlap = session.overlap(slot_start, slot_end);
        if overlap.is_zero() {
            continue;
        }
        match shares
            .iter_mut()
            .find(|share| share.category_id == session.category_id)
        {
            Some(share) => {
                share.duration += overlap;
                share.category_name = session.category_name.clone();
                share.category_color = session.category_color;
            }
            None => shares.push(SlotShare::new(session, overlap)),
        }
    }

    let mut best: Option<SlotShare> = None;
    for share in shares {
        match &best {
            Some(current) if share.duration <= current.duration => {}
            Some(_) | None => best = Some(share),
        }
    }
    best.filter(|share| share.duration > min_share)
}

/// Splits `[day_start, day_end)` into slots of `slot_length` and aggregates each of them. The
/// last slot is cut at `day_end`, so days with a daylight saving shift still end at midnight.
pub fn day_slots(
    sessions: &[Session],
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
    slot_length: Duration,
    min_share: Duration,
) -> Vec<Option<SlotShare>> {
    let mut slots = vec![];
    if slot_length <= Duration::zero() {
        return slots;
    }

    let mut slot_start = day_start;
    while slot_start < day_end {
        let slot_end = (slot_start + slot_length).min(day_end);
        // Sessions are ordered by start, everything from here on begins after the slot.
        let relevant = sessions
            .iter()
            .take_while(|session| session.start < slot_end)
            .filter(|session| session.end > slot_start);
        slots.push(slot_aggregate(relevant, slot_start, slot_end, min_share));
        slot_start = slot_end;
    }
    slots
}

/// Color for painting a whole day, taken from its dominant category.
///
/// `lookup` resolves the current color of a category. When the category no longer exists the
/// color snapshot of its latest session is used instead.
pub fn dominant_color(log: &DayLog, lookup: impl Fn(&CategoryId) -> Option<Color>) -> Option<Color> {
    let id = dominant_category(&log.totals)?;
    lookup(id).or_else(|| {
        log.sessions
            .iter()
            .rev()
            .find(|session| &session.category_id == id)
            .map(|session| session.category_color)
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use super::{
        day_slots, dominant_category, dominant_color, slot_aggregate, DEFAULT_MIN_SLOT_SHARE,
        SLOT_LENGTH,
    };
    use crate::tracker::{
        entities::{Category, CategoryId, Color, DayLog, Session},
        totals::Totals,
    };

    const TEST_DATE_TIME: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(), NaiveTime::MIN);

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_DATE_TIME) + Duration::seconds(seconds)
    }

    fn session(id: &str, color: Color, start: i64, end: i64) -> Session {
        let category = Category {
            id: id.into(),
            name: id.into(),
            color,
        };
        Session::starting_at(&category, at(start)).with_end(at(end))
    }

    fn totals(entries: &[(&str, i64)]) -> Totals {
        entries
            .iter()
            .map(|(id, seconds)| (CategoryId::from(*id), *seconds))
            .collect()
    }

    #[test]
    fn dominant_is_the_largest_total() {
        let totals = totals(&[("a", 100), ("b", 300), ("c", 200)]);
        assert_eq!(dominant_category(&totals), Some(&CategoryId::from("b")));
    }

    #[test]
    fn dominant_tie_goes_to_first_inserted() {
        let first = totals(&[("a", 300), ("b", 300)]);
        assert_eq!(dominant_category(&first), Some(&CategoryId::from("a")));

        let reversed = totals(&[("b", 300), ("a", 300)]);
        assert_eq!(dominant_category(&reversed), Some(&CategoryId::from("b")));
    }

    #[test]
    fn dominant_of_nothing_is_none() {
        assert_eq!(dominant_category(&Totals::new()), None);
    }

    #[test]
    fn slot_picks_largest_overlap_above_threshold() {
        let red = Color::rgb(255, 0, 0);
        let blue = Color::rgb(0, 0, 255);
        let sessions = vec![
            session("a", red, 0, 200),
            session("b", blue, 200, 500),
            session("a", red, 500, 700),
        ];

        // a: 200 + 100 inside [0, 600), b: 300. a is seen first and wins the tie.
        let share = slot_aggregate(&sessions, at(0), at(600), DEFAULT_MIN_SLOT_SHARE).unwrap();
        assert_eq!(share.category_id, CategoryId::from("a"));
        assert_eq!(share.duration, Duration::seconds(300));
        assert_eq!(share.category_color, red);
    }

    #[test]
    fn slot_below_threshold_is_empty() {
        let sessions = vec![session("a", Color::default(), 0, 180)];
        assert_eq!(
            slot_aggregate(&sessions, at(0), at(600), DEFAULT_MIN_SLOT_SHARE),
            None
        );

        let sessions = vec![session("a", Color::default(), 0, 181)];
        assert!(slot_aggregate(&sessions, at(0), at(600), DEFAULT_MIN_SLOT_SHARE).is_some());
    }

    #[test]
    fn slot_ignores_sessions_outside_window() {
        let sessions = vec![session("a", Color::default(), 0, 600)];
        assert_eq!(
            slot_aggregate(&sessions, at(600), at(1200), Duration::zero()),
            None
        );
    }

    #[test]
    fn day_has_144_ten_minute_slots() {
        let sessions = vec![
            session("a", Color::default(), 0, 1200),
            session("b", Color::default(), 3600 * 13, 3600 * 13 + 500),
        ];
        let slots = day_slots(
            &sessions,
            at(0),
            at(24 * 3600),
            SLOT_LENGTH,
            DEFAULT_MIN_SLOT_SHARE,
        );

        assert_eq!(slots.len(), 144);
        assert_eq!(slots.iter().filter(|slot| slot.is_some()).count(), 3);
        assert_eq!(
            slots[0].as_ref().unwrap().category_id,
            CategoryId::from("a")
        );
        assert_eq!(
            slots[78].as_ref().unwrap().category_id,
            CategoryId::from("b")
        );
    }

    #[test]
    fn short_day_cuts_last_slot() {
        let slots = day_slots(
            &[],
            at(0),
            at(23 * 3600 + 300),
            SLOT_LENGTH,
            DEFAULT_MIN_SLOT_SHARE,
        );
        assert_eq!(slots.len(), 139);
    }

    #[test]
    fn dominant_color_falls_back_to_snapshot() {
        let snapshot = Color::rgb(1, 2, 3);
        let current = Color::rgb(4, 5, 6);
        let log = DayLog {
            sessions: vec![session("gone", snapshot, 0, 600)],
            totals: totals(&[("gone", 600)]),
            ..Default::default()
        };

        assert_eq!(dominant_color(&log, |_| Some(current)), Some(current));
        assert_eq!(dominant_color(&log, |_| None), Some(snapshot));
        assert_eq!(dominant_color(&DayLog::default(), |_| Some(current)), None);
    }
}

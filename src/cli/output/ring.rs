use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

use crate::{
    tracker::{
        aggregate::{day_slots, SlotShare},
        entities::Session,
    },
    utils::time::day_bounds,
};

use super::colour;

const FILLED: &str = "█";
const EMPTY: &str = "·";

/// The day split into its two twelve hour rings. Each entry is one slot.
pub struct DayRings {
    pub am: Vec<Option<SlotShare>>,
    pub pm: Vec<Option<SlotShare>>,
}

/// Aggregates the local day `date` into slots of `slot_length` and splits them at noon.
pub fn day_rings(
    sessions: &[Session],
    date: NaiveDate,
    slot_length: Duration,
    min_share: Duration,
) -> DayRings {
    let (start, end) = day_bounds(date, &Local);
    split_at_noon(
        day_slots(sessions, start, end, slot_length, min_share),
        start,
        slot_length,
    )
}

fn split_at_noon(
    mut slots: Vec<Option<SlotShare>>,
    start: DateTime<Utc>,
    slot_length: Duration,
) -> DayRings {
    let noon = start + Duration::hours(12);
    let am_len = (0..slots.len())
        .take_while(|i| start + slot_length * (*i as i32) < noon)
        .count();
    let pm = slots.split_off(am_len);
    DayRings { am: slots, pm }
}

/// One character per slot. Painted slots use the color snapshot of their category.
pub fn render_row(slots: &[Option<SlotShare>], paint: bool) -> String {
    slots
        .iter()
        .map(|slot| match slot {
            Some(share) if paint => colour(share.category_color).paint(FILLED).to_string(),
            Some(_) => FILLED.to_string(),
            None => EMPTY.to_string(),
        })
        .collect()
}

/// Hour marks lined up with [render_row] for slots of `slot_length`.
pub fn render_scale(slots: usize, slot_length: Duration) -> String {
    let per_hour = (Duration::hours(1).num_seconds() / slot_length.num_seconds().max(1)).max(1);
    let mut scale = String::new();
    let mut index = 0;
    while index < slots as i64 {
        if index % per_hour == 0 {
            let label = format!("{}", (index / per_hour) % 12);
            let width = (label.len() as i64).min(slots as i64 - index);
            scale.push_str(&label[..width as usize]);
            index += width;
        } else {
            scale.push(' ');
            index += 1;
        }
    }
    scale
}

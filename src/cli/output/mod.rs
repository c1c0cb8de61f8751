pub mod ring;

use std::sync::Arc;

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use futures::{stream, Stream, StreamExt};

use crate::{
    storage::{category_storage::CategoryRegistry, log_storage::LogStorage},
    tracker::entities::{CategoryId, Color, DayLog},
};

const SWATCH: &str = "██";

/// Loads the logs of `days` a few at a time, in order.
pub fn load_days(
    storage: impl LogStorage,
    days: impl IntoIterator<Item = NaiveDate>,
) -> impl Stream<Item = (NaiveDate, Result<DayLog>)> {
    let storage = Arc::new(storage);
    stream::iter(days)
        .map(move |day| {
            let storage = storage.clone();
            async move { (day, storage.load_day_log(day).await) }
        })
        .buffered(4)
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

pub fn colour(color: Color) -> Colour {
    Colour::RGB(color.r, color.g, color.b)
}

pub fn swatch(color: Color) -> String {
    colour(color).paint(SWATCH).to_string()
}

/// `text` on a background of `color`, with a foreground that stays readable.
pub fn on_color(text: &str, color: Color) -> String {
    let luminance = 0.299 * color.r as f64 + 0.587 * color.g as f64 + 0.114 * color.b as f64;
    let foreground = if luminance > 140. {
        Colour::Black
    } else {
        Colour::White
    };
    Style::new()
        .on(colour(color))
        .fg(foreground)
        .paint(text)
        .to_string()
}

/// Name and color a category should be shown with. The registry wins, deleted categories fall
/// back to the snapshot stored with their latest session.
pub fn display_category(
    registry: &CategoryRegistry,
    log: &DayLog,
    id: &CategoryId,
) -> (String, Color) {
    if let Some(category) = registry.resolve(id) {
        return (category.name.to_string(), category.color);
    }
    log.sessions
        .iter()
        .rev()
        .find(|session| &session.category_id == id)
        .filter(|session| !session.category_name.is_empty())
        .map(|session| (session.category_name.to_string(), session.category_color))
        .unwrap_or_else(|| (id.to_string(), Color::default()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use futures::StreamExt;

    use super::{display_category, format_duration, load_days};
    use crate::{
        storage::{
            category_storage::CategoryRegistry,
            log_storage::{memory::MemoryLogStorage, LogStorage},
        },
        tracker::entities::{Category, CategoryId, Color, DayLog, Session},
    };

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(20 * 60)), "20m0s");
        assert_eq!(format_duration(Duration::seconds(3600 + 61)), "1h1m1s");
    }

    #[test]
    fn deleted_category_uses_snapshot() {
        let registry = CategoryRegistry::default();
        let gone = Category {
            id: "gone".into(),
            name: "Old project".into(),
            color: Color::rgb(1, 2, 3),
        };
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let log = DayLog {
            sessions: vec![Session::starting_at(&gone, start).with_end(start + Duration::hours(1))],
            ..Default::default()
        };

        let (name, color) = display_category(&registry, &log, &gone.id);
        assert_eq!(name, "Old project");
        assert_eq!(color, Color::rgb(1, 2, 3));

        let (name, color) = display_category(&registry, &log, &CategoryId::from("unknown"));
        assert_eq!(name, "unknown");
        assert_eq!(color, Color::default());
    }

    #[tokio::test]
    async fn days_are_loaded_in_order() -> Result<()> {
        let storage = Arc::new(MemoryLogStorage::default());
        let first = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut note = DayLog::default();
        note.note = "second".into();
        storage
            .save_day_log(first.succ_opt().unwrap(), &note)
            .await?;
        storage.broken.lock().unwrap().push(first);

        let days = first.iter_days().take(10).collect::<Vec<_>>();
        let loaded = load_days(storage, days.clone()).collect::<Vec<_>>().await;

        assert_eq!(loaded.iter().map(|(day, _)| *day).collect::<Vec<_>>(), days);
        assert!(loaded[0].1.is_err());
        assert_eq!(loaded[1].1.as_ref().unwrap().note, "second");
        assert!(loaded[2].1.as_ref().unwrap().is_empty());
        Ok(())
    }
}

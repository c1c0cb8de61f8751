use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use tracing::info;

use crate::{
    storage::{category_storage::CategoryRegistry, log_storage::LogStorage},
    tracker::{
        aggregate::{dominant_category, SLOT_LENGTH},
        entities::{Color, DayLog},
        quantize::sanitize,
    },
    utils::percentage::{seconds_percentage, Percentage},
};

use super::{
    dates::DayArgs,
    note::render_note,
    output::{
        display_category, format_duration,
        ring::{day_rings, render_row, render_scale},
        swatch,
    },
    AppContext,
};

#[derive(Debug, Parser)]
pub struct DayCommand {
    #[command(flatten)]
    day: DayArgs,
    #[arg(long, help = "Show stored sessions as they are, without quantizing them")]
    raw: bool,
}

/// One row of the totals table.
#[derive(Debug, PartialEq)]
struct TotalLine {
    name: String,
    color: Color,
    duration: Duration,
    share: Percentage,
}

/// Totals in the order categories were first recorded, with their share of the recorded time.
fn total_lines(log: &DayLog, registry: &CategoryRegistry) -> Vec<TotalLine> {
    let whole = log.totals.sum();
    log.totals
        .iter()
        .map(|(id, seconds)| {
            let (name, color) = display_category(registry, log, id);
            TotalLine {
                name,
                color,
                duration: Duration::seconds(seconds),
                share: seconds_percentage(seconds, whole),
            }
        })
        .collect()
}

pub async fn process_day_command(
    context: &AppContext,
    DayCommand { day, raw }: DayCommand,
) -> Result<()> {
    let date = day.resolve()?;
    let storage = context.log_storage()?;
    let registry = context.categories().load()?;

    let stored = storage.load_day_log(date).await?;
    let log = if raw {
        stored
    } else {
        sanitize(&stored, context.settings.unit()?)
    };

    print_day(context, date, &log, &registry);
    Ok(())
}

fn print_day(context: &AppContext, date: NaiveDate, log: &DayLog, registry: &CategoryRegistry) {
    println!("{}", date.format("%A %x"));

    if log.sessions.is_empty() {
        println!("Nothing recorded");
    } else {
        println!();
        for session in &log.sessions {
            let (name, color) = display_category(registry, log, &session.category_id);
            println!(
                "{}-{}\t{}\t{}\t{}",
                session.start.with_timezone(&Local).format("%H:%M"),
                session.end.with_timezone(&Local).format("%H:%M"),
                format_duration(session.duration()),
                swatch(color),
                name
            );
        }

        println!();
        for line in total_lines(log, registry) {
            println!(
                "{}\t{}\t{}\t{}",
                swatch(line.color),
                line.share,
                format_duration(line.duration),
                line.name
            );
        }

        if let Some(id) = dominant_category(&log.totals) {
            let (name, color) = display_category(registry, log, id);
            println!("\nMostly {} {}", swatch(color), name);
        }
    }

    let rings = day_rings(
        &log.sessions,
        date,
        SLOT_LENGTH,
        context.settings.slot_min_share(),
    );
    println!();
    println!("   {}", render_scale(rings.am.len(), SLOT_LENGTH));
    println!("AM {}", render_row(&rings.am, true));
    println!("PM {}", render_row(&rings.pm, true));

    if let Some(note) = render_note(&log.note) {
        println!("\n{note}");
    }
}

/// Quantizes a stored day log in place.
pub async fn process_sanitize_command(context: &AppContext, day: DayArgs) -> Result<()> {
    let date = day.resolve()?;
    let storage = context.log_storage()?;
    let unit = context.settings.unit()?;

    let stored = storage.load_day_log(date).await?;
    if sanitize(&stored, unit) == stored {
        println!("{date} is already quantized");
        return Ok(());
    }

    // A running timer may have saved since, quantize whatever is there now.
    let mut before = 0;
    let sanitized = storage
        .update_day_log(date, |log| {
            before = log.sessions.len();
            *log = sanitize(log, unit);
        })
        .await?;
    info!(
        "Sanitized {date} from {before} to {} sessions",
        sanitized.sessions.len()
    );
    println!(
        "{date}: {} sessions kept out of {before}, {} recorded",
        sanitized.sessions.len(),
        format_duration(Duration::seconds(sanitized.totals.sum()))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::total_lines;
    use crate::{
        storage::category_storage::CategoryRegistry,
        tracker::{
            accumulator::record_tick,
            entities::{Category, Color, DayLog},
        },
    };

    #[test]
    fn totals_keep_first_seen_order() -> anyhow::Result<()> {
        let mut registry = CategoryRegistry::default();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let writing = registry.add("Writing", Some(Color::rgb(9, 9, 9)), now)?;
        let reading = Category {
            id: "deleted".into(),
            name: "Reading".into(),
            color: Color::rgb(1, 1, 1),
        };

        let mut log = DayLog::default();
        for t in 0..300 {
            record_tick(&mut log, &reading, now + Duration::seconds(t));
        }
        for t in 300..1200 {
            record_tick(&mut log, &writing, now + Duration::seconds(t));
        }

        let lines = total_lines(&log, &registry);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "Reading");
        assert_eq!(lines[0].color, Color::rgb(1, 1, 1));
        assert_eq!(lines[0].share.to_string(), "25%");
        assert_eq!(lines[1].name, "Writing");
        assert_eq!(lines[1].duration, Duration::seconds(900));
        assert_eq!(lines[1].share.to_string(), "75%");
        Ok(())
    }
}

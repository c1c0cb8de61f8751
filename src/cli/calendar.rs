use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use futures::StreamExt;
use tracing::error;

use crate::{
    storage::category_storage::CategoryRegistry,
    tracker::{
        aggregate::dominant_color,
        entities::{Color, DayLog},
        quantize::{sanitize, Unit},
    },
    utils::time::month_days,
};

use super::{
    dates::parse_month,
    output::{load_days, on_color},
    AppContext,
};

const WEEK_HEADER: &str = "Mo Tu We Th Fr Sa Su";

#[derive(Debug, Parser)]
pub struct CalendarCommand {
    #[arg(long, short, help = "Month to show as YYYY-MM. Defaults to the current one")]
    month: Option<String>,
}

/// What a single calendar cell shows.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DayCell {
    Painted(Color),
    Empty,
    Unreadable,
}

fn day_cell(log: Result<DayLog>, unit: Unit, registry: &CategoryRegistry) -> DayCell {
    match log {
        Ok(log) => {
            let log = sanitize(&log, unit);
            dominant_color(&log, |id| registry.resolve(id).map(|c| c.color))
                .map(DayCell::Painted)
                .unwrap_or(DayCell::Empty)
        }
        Err(_) => DayCell::Unreadable,
    }
}

pub async fn process_calendar_command(
    context: &AppContext,
    CalendarCommand { month }: CalendarCommand,
) -> Result<()> {
    let first = parse_month(month.as_deref(), Local::now())?;
    let unit = context.settings.unit()?;
    let registry = context.categories().load()?;

    let cells = load_days(context.log_storage()?, month_days(first))
        .map(|(day, log)| {
            if let Err(e) = &log {
                error!("Failed to load {day} {e:?}");
            }
            (day, day_cell(log, unit, &registry))
        })
        .collect::<Vec<_>>()
        .await;

    println!("{}", first.format("%B %Y"));
    for line in render_month(first, &cells, true) {
        println!("{line}");
    }
    Ok(())
}

/// Monday first grid, one line per week.
fn render_month(first: NaiveDate, cells: &[(NaiveDate, DayCell)], paint: bool) -> Vec<String> {
    let mut lines = vec![WEEK_HEADER.to_string()];
    let mut line = "   ".repeat(first.weekday().num_days_from_monday() as usize);
    for (day, cell) in cells {
        let label = match cell {
            DayCell::Unreadable => "??".to_string(),
            _ => format!("{:>2}", day.day()),
        };
        let label = match cell {
            DayCell::Painted(color) if paint => on_color(&label, *color),
            _ => label,
        };
        line.push_str(&label);

        if day.weekday().num_days_from_monday() == 6 {
            lines.push(line.trim_end().to_string());
            line = String::new();
        } else {
            line.push(' ');
        }
    }
    if !line.trim().is_empty() {
        lines.push(line.trim_end().to_string());
    }
    lines
}

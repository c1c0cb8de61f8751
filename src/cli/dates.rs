use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};
use now::DateTimeNow;

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Day selection shared by every command working on a single day log.
#[derive(Debug, Clone, clap::Args)]
pub struct DayArgs {
    #[arg(
        long,
        short,
        help = "Day to use. Examples are \"today\", \"yesterday\", \"2 days ago\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

impl DayArgs {
    pub fn resolve(&self) -> Result<NaiveDate> {
        parse_day(self.date.as_deref(), self.date_style, Local::now())
    }
}

fn parse_day(date: Option<&str>, style: DateStyle, now: DateTime<Local>) -> Result<NaiveDate> {
    let Some(date) = date else {
        return Ok(now.date_naive());
    };
    match parse_date_string(date, now, style.into()) {
        Ok(v) => Ok(v.with_timezone(&Local).date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
    }
}

/// Parses `YYYY-MM` into the first day of that month. Without a value the current month is
/// used.
pub fn parse_month(month: Option<&str>, now: DateTime<Local>) -> Result<NaiveDate> {
    let Some(month) = month else {
        return Ok(now.beginning_of_month().date_naive());
    };
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d").map_err(|e| {
        Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Month {month} should look like 2025-03: {e}"),
            )
            .into()
    })
}

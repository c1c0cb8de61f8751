use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::Value;

use crate::storage::log_storage::LogStorage;

use super::{dates::DayArgs, AppContext};

#[derive(Debug, Subcommand)]
pub enum NoteCommand {
    #[command(about = "Print the note of a day")]
    Show {
        #[command(flatten)]
        day: DayArgs,
    },
    #[command(about = "Replace the note of a day")]
    Set {
        text: String,
        #[arg(long, help = "Store the text as a json document instead of plain text")]
        json: bool,
        #[command(flatten)]
        day: DayArgs,
    },
    #[command(about = "Remove the note of a day")]
    Clear {
        #[command(flatten)]
        day: DayArgs,
    },
}

pub async fn process_note_command(context: &AppContext, command: NoteCommand) -> Result<()> {
    let storage = context.log_storage()?;
    match command {
        NoteCommand::Show { day } => {
            let log = storage.load_day_log(day.resolve()?).await?;
            match render_note(&log.note) {
                Some(note) => println!("{note}"),
                None => println!("No note"),
            }
        }
        NoteCommand::Set { text, json, day } => {
            let note = parse_note(&text, json)?;
            replace_note(&storage, day.resolve()?, note).await?;
        }
        NoteCommand::Clear { day } => {
            replace_note(&storage, day.resolve()?, Value::Null).await?;
        }
    }
    Ok(())
}

/// Sessions and totals are left as they are, even when a running timer saves meanwhile.
async fn replace_note(storage: &impl LogStorage, date: NaiveDate, note: Value) -> Result<()> {
    storage.update_day_log(date, |log| log.note = note).await?;
    Ok(())
}

fn parse_note(text: &str, json: bool) -> Result<Value> {
    if json {
        serde_json::from_str(text).context("Note isn't valid json")
    } else {
        Ok(Value::String(text.to_owned()))
    }
}

/// Text to show for a note. Plain text notes are printed as they are, anything else as json.
pub fn render_note(note: &Value) -> Option<String> {
    match note {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => serde_json::to_string_pretty(other).ok(),
    }
}

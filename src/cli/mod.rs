pub mod calendar;
pub mod category;
pub mod dates;
pub mod day;
pub mod note;
pub mod output;
pub mod start;

use std::path::PathBuf;

use anyhow::Result;
use calendar::{process_calendar_command, CalendarCommand};
use category::{process_category_command, CategoryCommand};
use clap::{Parser, Subcommand};
use dates::DayArgs;
use day::{process_day_command, process_sanitize_command, DayCommand};
use note::{process_note_command, NoteCommand};
use start::{process_start_command, StartCommand};
use tracing::{debug, error};

use crate::{
    config::{Settings, SETTINGS_FILE},
    storage::{
        category_storage::CategoryStore, log_storage::LogStorageImpl,
        pause_storage::PauseStore, CATEGORIES_FILE, PAUSED_FILE, RECORDS_DIR,
    },
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::enable_logging,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Focustrack", version, long_about = None)]
#[command(about = "Focus timer keeping a daily log of where your time went", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Log everything and mirror it to stderr")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Runs a focus timer in this terminal and records it")]
    Start {
        #[command(flatten)]
        command: StartCommand,
    },
    #[command(about = "Manage categories time is recorded for")]
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    #[command(about = "Display sessions, totals and slot rings of a day")]
    Day {
        #[command(flatten)]
        command: DayCommand,
    },
    #[command(about = "Display a month with every day painted in its dominant color")]
    Calendar {
        #[command(flatten)]
        command: CalendarCommand,
    },
    #[command(about = "Read or replace the note attached to a day")]
    Note {
        #[command(subcommand)]
        command: NoteCommand,
    },
    #[command(about = "Rewrite a stored day log in quantized form")]
    Sanitize {
        #[command(flatten)]
        day: DayArgs,
    },
}

/// Everything commands need to find their data.
pub struct AppContext {
    pub dir: PathBuf,
    pub settings: Settings,
}

impl AppContext {
    pub fn load(dir: PathBuf) -> Result<Self> {
        let settings = Settings::load(&dir.join(SETTINGS_FILE))?;
        debug!("Using {dir:?} with {settings:?}");
        Ok(Self { dir, settings })
    }

    pub fn categories(&self) -> CategoryStore {
        CategoryStore::new(self.dir.join(CATEGORIES_FILE))
    }

    pub fn paused_round(&self) -> PauseStore {
        PauseStore::new(self.dir.join(PAUSED_FILE))
    }

    pub fn log_storage(&self) -> Result<LogStorageImpl> {
        Ok(LogStorageImpl::new(self.dir.join(RECORDS_DIR))?)
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let _logging = enable_logging(&dir, args.log)?;

    let context = AppContext::load(dir)?;

    let result = match args.commands {
        Commands::Start { command } => process_start_command(&context, command).await,
        Commands::Category { command } => process_category_command(&context, command),
        Commands::Day { command } => process_day_command(&context, command).await,
        Commands::Calendar { command } => process_calendar_command(&context, command).await,
        Commands::Note { command } => process_note_command(&context, command).await,
        Commands::Sanitize { day } => process_sanitize_command(&context, day).await,
    };
    // Logged here while the file writer is still alive.
    result.inspect_err(|e| error!("Error running cli {e:?}"))
}

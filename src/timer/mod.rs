use std::{io::Write, path::PathBuf, time::Duration};

use anyhow::Result;
use category_source::{CategorySource, RegistryCategorySource};
use chrono::{Local, TimeZone};
use countdown::Countdown;
use processing::{log_keeper::LogKeeper, ProcessingModule};
use ticker::TickerModule;
use tokio::sync::{mpsc, watch};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    config::Settings,
    storage::{
        category_storage::CategoryStore,
        log_storage::{LogStorage, LogStorageImpl},
        CATEGORIES_FILE, RECORDS_DIR,
    },
    tracker::entities::TickEvent,
    utils::clock::{Clock, DefaultClock},
};

pub mod category_source;
pub mod countdown;
pub mod processing;
pub mod shutdown;
pub mod ticker;

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Runs one focus round in the foreground until the countdown finishes or Ctrl-C is pressed.
/// Everything recorded is saved before returning. Returns the countdown as it was when the round
/// ended.
pub async fn start_timer(
    dir: PathBuf,
    settings: &Settings,
    countdown: Countdown,
    show_progress: bool,
) -> Result<Countdown> {
    let (sender, receiver) = mpsc::channel::<TickEvent>(10);
    let (progress_sender, progress_receiver) = watch::channel(countdown);

    let shutdown_token = CancellationToken::new();

    let source = RegistryCategorySource::new(CategoryStore::new(dir.join(CATEGORIES_FILE)));
    let ticker = create_ticker(
        sender,
        source,
        &shutdown_token,
        countdown,
        progress_sender,
        DefaultClock,
    );

    let storage = LogStorageImpl::new(dir.join(RECORDS_DIR))?;
    let processor = create_processor(storage, Local, receiver, settings)?;

    let last_progress = progress_receiver.clone();

    info!("Starting a {} round", countdown.render());
    let (_, _, ticker_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        print_progress(progress_receiver, show_progress),
        ticker.run(),
        processor.run(),
    );

    if let Err(ticker_result) = ticker_result {
        error!("Ticker module got an error {:?}", ticker_result);
    }

    let summary = processing_result
        .inspect_err(|e| error!("Processing module got an error {e:?}"))?;
    debug!("Round summary {summary:?}");

    let left = *last_progress.borrow();
    Ok(left)
}

/// Redraws the remaining time in place. Ends once the ticker drops its side of the channel.
async fn print_progress(progress: watch::Receiver<Countdown>, show_progress: bool) {
    let mut updates = WatchStream::from_changes(progress);
    while let Some(countdown) = updates.next().await {
        if !show_progress {
            continue;
        }
        print!("\r{}", countdown.render());
        let _ = std::io::stdout().flush();
    }
    if show_progress {
        println!();
    }
}

fn create_ticker(
    sender: mpsc::Sender<TickEvent>,
    source: impl CategorySource + 'static,
    shutdown_token: &CancellationToken,
    countdown: Countdown,
    progress: watch::Sender<Countdown>,
    clock: impl Clock,
) -> TickerModule {
    TickerModule::new(
        sender,
        Box::new(source),
        shutdown_token.clone(),
        countdown,
        progress,
        DEFAULT_TICK_INTERVAL,
        Box::new(clock),
    )
}

fn create_processor<S: LogStorage, Tz: TimeZone>(
    storage: S,
    tz: Tz,
    receiver: mpsc::Receiver<TickEvent>,
    settings: &Settings,
) -> Result<ProcessingModule<LogKeeper<S, Tz>>> {
    let keeper = LogKeeper::new(
        storage,
        tz,
        settings.unit()?,
        settings.gap_tolerance(),
        settings.autosave_interval(),
    );
    Ok(ProcessingModule::new(receiver, keeper))
}

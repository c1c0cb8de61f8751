use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, warn};

use crate::{
    storage::{
        category_storage::CategoryStore,
        pause_storage::{PauseStore, PausedRound},
    },
    timer::{
        countdown::{Countdown, CountdownState, MAX_MINUTES, MIN_MINUTES},
        start_timer,
    },
    tracker::entities::{Category, CategoryId},
};

use super::{output::swatch, AppContext};

#[derive(Debug, Parser)]
pub struct StartCommand {
    #[arg(
        short,
        long,
        help = "Length of the round in minutes. Defaults to default_minutes from settings.json"
    )]
    minutes: Option<u32>,
    #[arg(short, long, help = "Select this category before starting")]
    category: Option<String>,
    #[arg(short, long, help = "Don't print the remaining time")]
    quiet: bool,
    #[arg(
        short,
        long,
        conflicts_with = "minutes",
        help = "Continue the round stopped last time with the time it had left"
    )]
    resume: bool,
}

pub async fn process_start_command(
    context: &AppContext,
    StartCommand {
        minutes,
        category,
        quiet,
        resume,
    }: StartCommand,
) -> Result<()> {
    let pauses = context.paused_round();
    let paused = if resume { resumable(&pauses)? } else { None };
    if resume && paused.is_none() {
        println!("Nothing to resume, starting a fresh round");
    }

    let store = context.categories();
    let active = select_category(&store, category, paused.as_ref())?;

    let countdown = match &paused {
        Some((_, countdown)) => {
            println!("Resuming with {} left", countdown.render());
            *countdown
        }
        None => {
            let minutes = minutes.unwrap_or(context.settings.default_minutes);
            if !(MIN_MINUTES..=MAX_MINUTES).contains(&minutes) {
                println!(
                    "Rounds last between {MIN_MINUTES} and {MAX_MINUTES} minutes, clamping {minutes}"
                );
            }
            Countdown::from_minutes(minutes)
        }
    };

    println!(
        "{} {} for {}. Ctrl-C stops early",
        swatch(active.color),
        active.name,
        countdown.render()
    );
    info!("Starting round for {}", active.id);

    let left = start_timer(context.dir.clone(), &context.settings, countdown, !quiet).await?;

    let category = store.load()?.active().id;
    match remember_round(&pauses, left, category, Utc::now())? {
        Some(_) => println!(
            "Saved, {} left. Continue with `focustrack start --resume`",
            left.render()
        ),
        None => println!("Saved"),
    }
    Ok(())
}

/// The paused round with its countdown, if there is one worth continuing.
fn resumable(pauses: &PauseStore) -> Result<Option<(PausedRound, Countdown)>> {
    let Some(round) = pauses.load()? else {
        return Ok(None);
    };
    match round.countdown() {
        Some(countdown) => Ok(Some((round, countdown))),
        None => {
            warn!("Paused round {round:?} can't be continued");
            pauses.clear()?;
            Ok(None)
        }
    }
}

/// An explicit category wins. A resumed round goes back to its own category unless it was
/// deleted meanwhile.
fn select_category(
    store: &CategoryStore,
    explicit: Option<String>,
    paused: Option<&(PausedRound, Countdown)>,
) -> Result<Category> {
    match (explicit, paused) {
        (Some(id), _) => store.update(|registry| registry.select(&CategoryId::new(id))),
        (None, Some((round, _))) => store.update(|registry| {
            Ok(registry
                .select(&round.category)
                .unwrap_or_else(|_| registry.active()))
        }),
        (None, None) => Ok(store.load()?.active()),
    }
}

/// Keeps a round that was stopped early for `--resume`. A finished round clears it.
fn remember_round(
    pauses: &PauseStore,
    left: Countdown,
    category: CategoryId,
    now: DateTime<Utc>,
) -> Result<Option<PausedRound>> {
    match left.state() {
        CountdownState::Running => {
            let round = PausedRound::new(left, category, now);
            pauses.save(&round)?;
            Ok(Some(round))
        }
        CountdownState::Finished => {
            pauses.clear()?;
            Ok(None)
        }
    }
}

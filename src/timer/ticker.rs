use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{tracker::entities::TickEvent, utils::clock::Clock};

use super::{
    category_source::CategorySource,
    countdown::{Countdown, CountdownState},
};

/// Emits one [TickEvent] per second while the countdown runs.
pub struct TickerModule {
    next: mpsc::Sender<TickEvent>,
    source: Box<dyn CategorySource>,
    shutdown: CancellationToken,
    countdown: Countdown,
    progress: watch::Sender<Countdown>,
    tick_frequency: Duration,
    time_provider: Box<dyn Clock>,
}

impl TickerModule {
    pub fn new(
        next: mpsc::Sender<TickEvent>,
        source: Box<dyn CategorySource>,
        shutdown: CancellationToken,
        countdown: Countdown,
        progress: watch::Sender<Countdown>,
        tick_frequency: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            source,
            shutdown,
            countdown,
            progress,
            tick_frequency,
            time_provider,
        }
    }

    fn next_tick(&mut self) -> Result<TickEvent> {
        let category = self.source.active_category()?;
        let timestamp = self.time_provider.time();
        Ok(TickEvent {
            category,
            timestamp,
        })
    }

    /// Executes the ticker event loop. A tick is sent after each elapsed second, so a countdown
    /// of `n` seconds produces `n` ticks. When the countdown finishes the shutdown token is
    /// cancelled for everyone else.
    pub async fn run(mut self) -> Result<()> {
        let mut tick_point = self.time_provider.instant();
        loop {
            tick_point += self.tick_frequency;

            tokio::select! {
                // Cancelation means we stop execution of the event loop. Which means we also drop
                // the sender channel and consequently stop processing module.
                _ = self.shutdown.cancelled() => {
                    info!("Timer stopped with {} left", self.countdown.render());
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(tick_point) => ()
            }

            match self.next_tick() {
                Ok(tick) => {
                    let span = info_span!("Sending tick");
                    debug!("Sending tick {:?}", tick);
                    self.next
                        .send(tick)
                        .instrument(span)
                        .await
                        .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
                }
                Err(e) => {
                    error!("Couldn't determine the active category {:?}", e)
                }
            }

            let state = self.countdown.tick();
            // Nobody watching the progress is fine.
            let _ = self.progress.send(self.countdown);

            if state == CountdownState::Finished {
                info!("Timer finished");
                self.shutdown.cancel();
                return Ok(());
            }
        }
    }
}

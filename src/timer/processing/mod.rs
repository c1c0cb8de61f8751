use anyhow::Result;
use module::TickProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, trace};

use crate::tracker::{accumulator::TickOutcome, entities::TickEvent};

pub mod log_keeper;
pub mod module;

/// What happened to the ticks of one round.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub sessions_started: usize,
    pub extended: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl RoundSummary {
    fn count(&mut self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Started => self.sessions_started += 1,
            TickOutcome::Extended => self.extended += 1,
            TickOutcome::Ignored => self.ignored += 1,
        }
    }

    /// Ticks that made it into the log.
    pub fn recorded(&self) -> usize {
        self.sessions_started + self.extended
    }
}

/// Drains the tick channel into a [TickProcessor], then finalizes it. The ticker never waits on
/// storage since everything here happens behind the channel.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<TickEvent>,
    processor: Processor,
}

impl<P: TickProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<TickEvent>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<RoundSummary> {
        let mut summary = RoundSummary::default();
        while let Some(tick) = self.receiver.recv().await {
            let category = &tick.category.id;
            match self.processor.process_next(&tick).await {
                Ok(TickOutcome::Started) => {
                    debug!("Session of {category} started at {}", tick.timestamp);
                    summary.count(TickOutcome::Started);
                }
                Ok(outcome) => {
                    trace!("Tick of {category} at {} {outcome:?}", tick.timestamp);
                    summary.count(outcome);
                }
                Err(e) => {
                    error!("Failed to record tick of {category} at {}: {e:?}", tick.timestamp);
                    summary.failed += 1;
                }
            }
        }
        self.receiver.close();

        info!(
            "Round over, {} ticks recorded in {} new sessions, {} ignored, {} failed",
            summary.recorded(),
            summary.sessions_started,
            summary.ignored,
            summary.failed
        );
        self.processor.finalize().await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tokio::sync::mpsc;

    use super::{module::TickProcessor, ProcessingModule, RoundSummary};
    use crate::tracker::{
        accumulator::{record_tick, TickOutcome},
        entities::{Category, Color, DayLog, TickEvent},
    };

    /// Records into memory and fails on ticks of the "broken" category.
    #[derive(Default)]
    struct InMemory {
        log: DayLog,
        finalized: bool,
    }

    impl TickProcessor for &mut InMemory {
        async fn process_next(&mut self, tick: &TickEvent) -> Result<TickOutcome> {
            if tick.category.id.as_str() == "broken" {
                bail!("can't record");
            }
            Ok(record_tick(&mut self.log, &tick.category, tick.timestamp))
        }

        async fn finalize(&mut self) -> Result<()> {
            self.finalized = true;
            Ok(())
        }
    }

    fn tick(id: &str, timestamp: DateTime<Utc>) -> TickEvent {
        TickEvent {
            category: Category {
                id: id.into(),
                name: id.into(),
                color: Color::rgb(0, 0, 0),
            },
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_summary_counts_outcomes() -> Result<()> {
        let start = Utc.with_ymd_and_hms(2025, 2, 3, 10, 0, 0).unwrap();
        let (sender, receiver) = mpsc::channel(32);
        let mut processor = InMemory::default();

        for t in 1..=3 {
            sender.send(tick("a", start + Duration::seconds(t))).await?;
        }
        // Older than what is already recorded.
        sender.send(tick("a", start)).await?;
        sender.send(tick("broken", start + Duration::seconds(4))).await?;
        sender.send(tick("b", start + Duration::seconds(10))).await?;
        drop(sender);

        let summary = ProcessingModule::new(receiver, &mut processor).run().await?;

        assert_eq!(
            summary,
            RoundSummary {
                sessions_started: 2,
                extended: 2,
                ignored: 1,
                failed: 1,
            }
        );
        assert_eq!(summary.recorded(), 4);
        assert!(processor.finalized);
        assert_eq!(processor.log.sessions.len(), 2);
        Ok(())
    }
}

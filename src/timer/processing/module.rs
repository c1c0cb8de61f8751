use anyhow::Result;

use crate::tracker::{accumulator::TickOutcome, entities::TickEvent};

/// Consumer of ticks. [LogKeeper](super::log_keeper::LogKeeper) is the one used by the timer.
pub trait TickProcessor {
    /// Records a tick and says what it did to the log.
    fn process_next(
        &mut self,
        tick: &TickEvent,
    ) -> impl std::future::Future<Output = Result<TickOutcome>>;

    /// Called once the ticker is gone. Last chance to persist anything.
    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}

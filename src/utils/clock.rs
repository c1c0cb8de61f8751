use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of wall clock time and timer sleeps for the ticker. Tests swap it for a clock that
/// starts at a fixed date and follows tokio's paused time.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    /// Wall clock time stamped onto ticks.
    fn time(&self) -> DateTime<Utc>;

    /// Monotonic instant used for scheduling ticks without drift.
    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Clock that starts at `start_time` and moves with tokio time, so paused tests run through
/// minutes of ticks instantly.
#[cfg(test)]
#[derive(Clone)]
pub struct TestClock {
    start_time: DateTime<Utc>,
    reference: Instant,
}

#[cfg(test)]
impl TestClock {
    pub fn starting_at(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            reference: Instant::now(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for TestClock {
    fn time(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.reference.elapsed())
            .expect("Test durations are small");
        self.start_time + elapsed
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

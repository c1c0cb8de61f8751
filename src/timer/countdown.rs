pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 60;
pub const DEFAULT_MINUTES: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Running,
    Finished,
}

/// Remaining time of a focus round, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    remaining: u32,
}

impl Countdown {
    /// Creates a countdown. Minutes are clamped to `MIN_MINUTES..=MAX_MINUTES`.
    pub fn from_minutes(minutes: u32) -> Self {
        let total = minutes.clamp(MIN_MINUTES, MAX_MINUTES) * 60;
        Self {
            total,
            remaining: total,
        }
    }

    /// Continues a countdown stopped with `remaining` seconds left. None unless `total` is a
    /// valid round length and there is something left of it.
    pub fn resume(total: u32, remaining: u32) -> Option<Self> {
        let valid = (MIN_MINUTES * 60..=MAX_MINUTES * 60).contains(&total)
            && (1..=total).contains(&remaining);
        valid.then_some(Self { total, remaining })
    }

    /// Advances by one second.
    pub fn tick(&mut self) -> CountdownState {
        self.remaining = self.remaining.saturating_sub(1);
        self.state()
    }

    pub fn state(&self) -> CountdownState {
        if self.remaining == 0 {
            CountdownState::Finished
        } else {
            CountdownState::Running
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// `MM:SS`
    pub fn render(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

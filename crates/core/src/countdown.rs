//! Pure countdown arithmetic. The ticking itself lives in the services crate.

/// What a single tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still running, with this many seconds left.
    Running(u32),
    /// This tick reached zero. Reported exactly once.
    Expired,
    /// Already expired; the tick was ignored.
    Inert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    remaining: u32,
    expired: bool,
}

impl Countdown {
    /// A countdown of `total_secs`. A zero budget starts already expired.
    #[must_use]
    pub fn new(total_secs: u32) -> Self {
        Self {
            total: total_secs,
            remaining: total_secs,
            expired: total_secs == 0,
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Consume one elapsed second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.expired {
            return TickOutcome::Inert;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.remaining)
        }
    }
}

/// Render seconds as `MM:SS`. Minutes keep growing past 99.
#[must_use]
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// A recurring one-second tick source for a timed session.
///
/// Ticks are produced by a background task and buffered on a channel. The
/// task is aborted by [`stop`](CountdownTimer::stop) or on drop; once stopped
/// the timer never yields again, even if ticks were still buffered.
///
/// Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct CountdownTimer {
    ticks: mpsc::Receiver<()>,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    /// Tick every `period`, starting one period from now.
    #[must_use]
    pub fn start(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        Self {
            ticks: rx,
            task: Some(task),
        }
    }

    #[must_use]
    pub fn every_second() -> Self {
        Self::start(Duration::from_secs(1))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Wait for the next tick. Returns `None` once stopped.
    pub async fn tick(&mut self) -> Option<()> {
        if self.task.is_none() {
            return None;
        }
        self.ticks.recv().await
    }

    /// Abort the background task and discard pending ticks.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.ticks.close();
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let mut timer = CountdownTimer::every_second();
        let before = tokio::time::Instant::now();
        assert_eq!(timer.tick().await, Some(()));
        assert_eq!(timer.tick().await, Some(()));
        assert!(before.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timer_never_yields() {
        let mut timer = CountdownTimer::every_second();
        assert_eq!(timer.tick().await, Some(()));
        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.tick().await, None);
    }
}

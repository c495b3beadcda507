//! Time utilities and tick sources for the simulation loop

use std::future::Future;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Something that says when the next simulation step is due.
///
/// A stopped source never yields, so a loop can `select!` on it alongside
/// its command queue without special casing the idle state.
pub trait TickSource: Send {
    fn start(&mut self);

    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Resolves when the next tick is due
    fn next_tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Wall-clock ticks at a fixed period
#[derive(Debug)]
pub struct IntervalTicker {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }
}

impl TickSource for IntervalTicker {
    fn start(&mut self) {
        if self.interval.is_some() {
            return;
        }
        let mut ticker = interval(self.period);
        // A late step is dropped, never doubled up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(ticker);
    }

    fn stop(&mut self) {
        self.interval = None;
    }

    fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    fn next_tick(&mut self) -> impl Future<Output = ()> + Send {
        async move {
            match self.interval.as_mut() {
                Some(ticker) => {
                    ticker.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        }
    }
}

/// Ticks as fast as the loop can take them; for tests and replays
#[derive(Debug, Default)]
pub struct StepTicker {
    running: bool,
}

impl TickSource for StepTicker {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn next_tick(&mut self) -> impl Future<Output = ()> + Send {
        let running = self.running;
        async move {
            if running {
                tokio::task::yield_now().await;
            } else {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, task};

    #[test]
    fn stopped_step_ticker_never_fires() {
        let mut ticker = StepTicker::default();
        let mut tick = task::spawn(ticker.next_tick());
        assert_pending!(tick.poll());
    }

    #[tokio::test]
    async fn running_step_ticker_fires() {
        let mut ticker = StepTicker::default();
        ticker.start();
        assert!(ticker.is_running());
        ticker.next_tick().await;
        ticker.stop();
        assert!(!ticker.is_running());
    }

    #[tokio::test]
    async fn interval_ticker_start_is_idempotent() {
        let mut ticker = IntervalTicker::new(Duration::from_millis(1));
        assert!(!ticker.is_running());
        ticker.start();
        ticker.start();
        assert!(ticker.is_running());
        ticker.next_tick().await;
        ticker.stop();
        let mut tick = task::spawn(ticker.next_tick());
        assert_pending!(tick.poll());
    }
}

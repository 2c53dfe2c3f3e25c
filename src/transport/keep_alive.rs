use tokio::time::{interval_at, sleep_until, Duration, Instant, Interval, MissedTickBehavior};

use crate::config::ClientConfig;

/// Keep-alive schedule and receive-idle detection for one connection.
///
/// The ticker fires once per interval, starting one interval after
/// [`restart`](Self::restart). The idle deadline passes when nothing has been
/// received for the configured timeout.
pub struct KeepAlive {
    interval: Option<Duration>,
    idle_timeout: Option<Duration>,
    ticker: Option<Interval>,
    last_activity: Instant,
}

impl KeepAlive {
    pub fn new(interval: Duration, idle_timeout: Option<Duration>) -> Self {
        Self {
            interval: Some(interval).filter(|d| !d.is_zero()),
            idle_timeout: idle_timeout.filter(|d| !d.is_zero()),
            ticker: None,
            last_activity: Instant::now(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.keep_alive_interval(), config.receive_timeout())
    }

    /// Never ticks and never expires.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, None)
    }

    /// Reset both the schedule and the idle clock to now.
    pub fn restart(&mut self) {
        self.ticker = None;
        self.mark_activity();
    }

    pub fn mark_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Wait for the next keep-alive slot.
    pub async fn tick(&mut self) {
        let Some(period) = self.interval else {
            return std::future::pending().await;
        };
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;
    }

    /// When the connection counts as dead unless more data arrives first.
    pub fn deadline(&self) -> Option<Instant> {
        self.idle_timeout.map(|timeout| self.last_activity + timeout)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }
}

/// Sleep until `deadline`, or forever without one.
pub async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

//! Frame pacing shared by the capture sources

use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Fixed-rate ticker, created on first use so sources can be built outside a runtime
#[derive(Debug)]
pub(crate) struct Pacer {
    period: Duration,
    ticker: Option<Interval>,
}

impl Pacer {
    pub(crate) fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self {
            period: Duration::from_secs_f64(1.0 / fps),
            ticker: None,
        }
    }

    /// Wait for the next frame slot; late slots are skipped, not bunched up
    pub(crate) async fn tick(&mut self) {
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        ticker.tick().await;
    }

    pub(crate) fn period(&self) -> Duration {
        self.period
    }
}

//! Tick source for the monitoring loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

/// Waits until the next poll is due.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

/// Sleeps a fixed period per tick. A shutdown notification cuts the
/// current sleep short so the loop can see its stop flag.
#[derive(Debug, Clone)]
pub struct IntervalTicker {
    period: Duration,
    shutdown: Option<Arc<Notify>>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            shutdown: None,
        }
    }

    pub fn with_shutdown(period: Duration, shutdown: Arc<Notify>) -> Self {
        Self {
            period,
            shutdown: Some(shutdown),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        match &self.shutdown {
            Some(shutdown) => {
                tokio::select! {
                    _ = tokio::time::sleep(self.period) => {}
                    _ = shutdown.notified() => {}
                }
            }
            None => tokio::time::sleep(self.period).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tick_sleeps_for_period() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(300));
        let start = tokio::time::Instant::now();
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_sleep() {
        let notify = Arc::new(Notify::new());
        let mut ticker = IntervalTicker::with_shutdown(Duration::from_secs(300), notify.clone());
        notify.notify_one();
        let start = tokio::time::Instant::now();
        ticker.tick().await;
        assert!(start.elapsed() < Duration::from_secs(300));
    }
}

//! Watchdog that warns when a streaming read goes quiet.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Raised when the stream has been quiet for more than two poll periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessWarning {
    pub idle: Duration,
}

/// Background watchdog for a streaming read.
///
/// The monitor only observes the last-activity instant published by the
/// read loop; it never cancels the read. Dropping it stops the timer, so
/// every exit path of the read loop releases it.
pub struct LivenessMonitor {
    activity: watch::Sender<Instant>,
    cancel: CancellationToken,
}

impl LivenessMonitor {
    pub fn start(
        interval: Duration,
        cancel: CancellationToken,
        warnings: mpsc::UnboundedSender<LivenessWarning>,
    ) -> Self {
        let (activity, activity_rx) = watch::channel(Instant::now());
        let interval = interval.max(Duration::from_millis(1));
        let threshold = interval * 2;
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let idle = activity_rx.borrow().elapsed();
                        if idle > threshold {
                            warn!(
                                idle_ms = idle.as_millis() as u64,
                                "No data received from the backend; connection may be stale"
                            );
                            if warnings.send(LivenessWarning { idle }).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self { activity, cancel }
    }

    /// Note that a chunk just arrived.
    pub fn record_activity(&self) {
        self.activity.send_replace(Instant::now());
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for LivenessMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn warns_after_two_quiet_periods() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _monitor = LivenessMonitor::start(PERIOD, CancellationToken::new(), tx);

        tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err(), "exactly two periods is not stale yet");

        tokio::time::sleep(PERIOD).await;
        let warning = rx.try_recv().expect("warning after third tick");
        assert!(warning.idle > PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_resets_the_idle_clock() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = LivenessMonitor::start(PERIOD, CancellationToken::new(), tx);

        tokio::time::sleep(Duration::from_secs(100)).await;
        monitor.record_activity();
        tokio::time::sleep(Duration::from_secs(85)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(PERIOD).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_monitor_stops_the_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let monitor = LivenessMonitor::start(PERIOD, cancel.clone(), tx);
        assert!(!monitor.is_stopped());

        drop(monitor);
        assert!(cancel.is_cancelled());
        assert!(rx.recv().await.is_none(), "task exits and releases its sender");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_the_parent_token_stops_the_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let parent = CancellationToken::new();
        let monitor = LivenessMonitor::start(PERIOD, parent.child_token(), tx);

        parent.cancel();
        assert!(monitor.is_stopped());
        assert!(rx.recv().await.is_none());
    }
}

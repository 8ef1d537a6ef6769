//! Position/duration sampling
//!
//! The poller ticks on a fixed interval and publishes a [`StatusSample`] on
//! the session's event hub, where the host's label picks it up.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::events::{EventHub, SessionEvent};
use super::state::PlaybackState;

/// One position sample. `None` means the pipeline could not answer yet,
/// which is normal before it reaches Paused.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusSample {
    pub position: Option<Duration>,
    pub duration: Option<Duration>,
    pub state: PlaybackState,
}

impl StatusSample {
    pub fn unknown(state: PlaybackState) -> Self {
        Self {
            position: None,
            duration: None,
            state,
        }
    }

    pub fn position_secs(&self) -> Option<u64> {
        self.position.map(|p| p.as_secs())
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.duration.map(|d| d.as_secs())
    }
}

/// `Duration: 12/30 sec  State [Playing]`, with `--` for unknown values
impl fmt::Display for StatusSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn secs(value: Option<u64>) -> String {
            value.map(|s| s.to_string()).unwrap_or_else(|| "--".to_string())
        }
        write!(
            f,
            "Duration: {}/{} sec  State [{}]",
            secs(self.position_secs()),
            secs(self.duration_secs()),
            self.state
        )
    }
}

/// Anything that can be sampled by the poller
pub trait StatusSource: Send + Sync + 'static {
    fn poll_status(&self) -> StatusSample;
}

/// Background task emitting `SessionEvent::Status` on a fixed interval.
///
/// Must be started from within a tokio runtime. Stops when dropped.
pub struct StatusPoller {
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn spawn(source: Arc<dyn StatusSource>, hub: EventHub, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                // State queries may block briefly on a pending transition
                let source = source.clone();
                match tokio::task::spawn_blocking(move || source.poll_status()).await {
                    Ok(sample) => hub.emit(SessionEvent::Status(sample)),
                    Err(e) => {
                        log::warn!("Status poll failed: {}", e);
                        break;
                    }
                }
            }
        });

        log::debug!("Status polling started every {:?}", period);
        Self { task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("Status polling stopped");
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Counter(AtomicU64);

    impl StatusSource for Counter {
        fn poll_status(&self) -> StatusSample {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            StatusSample {
                position: Some(Duration::from_secs(n)),
                duration: Some(Duration::from_secs(60)),
                state: PlaybackState::Playing,
            }
        }
    }

    #[test]
    fn test_label_with_unknown_values() {
        let sample = StatusSample::unknown(PlaybackState::Uninitialized);
        assert_eq!(sample.to_string(), "Duration: --/-- sec  State [Uninitialised]");
    }

    #[test]
    fn test_label_truncates_to_seconds() {
        let sample = StatusSample {
            position: Some(Duration::from_millis(12_900)),
            duration: Some(Duration::from_secs(30)),
            state: PlaybackState::Paused,
        };
        assert_eq!(sample.to_string(), "Duration: 12/30 sec  State [Paused]");
    }

    #[tokio::test]
    async fn test_poller_emits_and_stops() {
        let hub = EventHub::new();
        let mut queue = hub.subscribe();
        let source = Arc::new(Counter(AtomicU64::new(0)));
        let mut poller = StatusPoller::spawn(source, hub.clone(), Duration::from_millis(10));

        let first = tokio::time::timeout(Duration::from_secs(5), queue.recv()).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), queue.recv()).await.unwrap();
        match (first, second) {
            (Some(SessionEvent::Status(a)), Some(SessionEvent::Status(b))) => {
                assert_eq!(a.position_secs(), Some(0));
                assert_eq!(b.position_secs(), Some(1));
            }
            other => panic!("unexpected events: {:?}", other),
        }

        assert!(poller.is_running());
        poller.stop();
        assert!(!poller.is_running());

        queue.drain();
        let after_stop = tokio::time::timeout(Duration::from_millis(100), queue.recv()).await;
        assert!(after_stop.is_err(), "status emitted after stop: {:?}", after_stop);
    }
}

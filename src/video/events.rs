//! Session Event Streaming
//!
//! Bus notifications are handled on the session's background thread and then
//! published here. Hosts either register a [`SessionListener`] (called on the
//! background thread) or drain an [`EventQueue`] from their UI loop.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::overlay::SurfaceHandle;
use super::state::StateChange;
use super::status::StatusSample;

/// Channel capacity per hub.
const CHANNEL_CAPACITY: usize = 256;

/// Session event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Pipeline error; the session has been moved to Ready
    Error {
        source: Option<String>,
        message: String,
        debug: Option<String>,
    },
    Warning {
        source: Option<String>,
        message: String,
    },
    /// End of stream reached; the session has been moved to Ready
    EndOfStream,
    StateChanged(StateChange),
    Buffering {
        percent: i32,
    },
    /// Video sink was bound; `handle` is None when no surface was attached
    SurfaceBound {
        handle: Option<SurfaceHandle>,
    },
    MissingPlugin {
        name: String,
    },
    /// Stream tags changed on a playbin
    TagsChanged,
    Application {
        name: String,
    },
    /// Periodic position sample
    Status(StatusSample),
}

/// Typed callbacks for session events, invoked on the background thread.
///
/// Every method defaults to a no-op, so listeners implement only what they need.
pub trait SessionListener: Send + Sync {
    fn on_error(&self, _source: Option<&str>, _message: &str, _debug: Option<&str>) {}

    fn on_warning(&self, _source: Option<&str>, _message: &str) {}

    fn on_end_of_stream(&self) {}

    fn on_state_changed(&self, _change: &StateChange) {}

    fn on_buffering(&self, _percent: i32) {}

    fn on_surface_bound(&self, _handle: Option<SurfaceHandle>) {}

    fn on_missing_plugin(&self, _name: &str) {}

    fn on_tags_changed(&self) {}

    fn on_application(&self, _name: &str) {}

    fn on_status(&self, _sample: &StatusSample) {}
}

fn dispatch(listener: &dyn SessionListener, event: &SessionEvent) {
    match event {
        SessionEvent::Error { source, message, debug } => {
            listener.on_error(source.as_deref(), message, debug.as_deref())
        }
        SessionEvent::Warning { source, message } => listener.on_warning(source.as_deref(), message),
        SessionEvent::EndOfStream => listener.on_end_of_stream(),
        SessionEvent::StateChanged(change) => listener.on_state_changed(change),
        SessionEvent::Buffering { percent } => listener.on_buffering(*percent),
        SessionEvent::SurfaceBound { handle } => listener.on_surface_bound(*handle),
        SessionEvent::MissingPlugin { name } => listener.on_missing_plugin(name),
        SessionEvent::TagsChanged => listener.on_tags_changed(),
        SessionEvent::Application { name } => listener.on_application(name),
        SessionEvent::Status(sample) => listener.on_status(sample),
    }
}

/// Fan-out point for session events, backed by `tokio::sync::broadcast`.
///
/// Safe to emit from any thread, including non-runtime threads.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<SessionEvent>,
    listeners: Arc<RwLock<Vec<Arc<dyn SessionListener>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    /// Call listeners, then publish to queue subscribers.
    pub fn emit(&self, event: SessionEvent) {
        // Snapshot so a listener may register another listener
        let listeners: Vec<Arc<dyn SessionListener>> = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for listener in &listeners {
            dispatch(listener.as_ref(), &event);
        }
        // Ignore error if no subscribers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> EventQueue {
        EventQueue {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscription drained by the host's UI loop
pub struct EventQueue {
    rx: broadcast::Receiver<SessionEvent>,
}

impl EventQueue {
    /// Everything queued so far, without blocking
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Event queue lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// Wait for the next event. None once the hub is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Event queue lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        errors: Mutex<Vec<String>>,
        eos: Mutex<u32>,
    }

    impl SessionListener for Recorder {
        fn on_error(&self, _source: Option<&str>, message: &str, _debug: Option<&str>) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn on_end_of_stream(&self) {
            *self.eos.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_listener_receives_typed_payloads() {
        let hub = EventHub::new();
        let recorder = Arc::new(Recorder::default());
        hub.add_listener(recorder.clone());

        hub.emit(SessionEvent::Error {
            source: Some("/playbin0/souphttpsrc0".into()),
            message: "Could not resolve server name.".into(),
            debug: None,
        });
        hub.emit(SessionEvent::EndOfStream);
        hub.emit(SessionEvent::TagsChanged);

        assert_eq!(*recorder.errors.lock().unwrap(), vec!["Could not resolve server name."]);
        assert_eq!(*recorder.eos.lock().unwrap(), 1);
    }

    struct Registering {
        hub: EventHub,
        added: Arc<Recorder>,
    }

    impl SessionListener for Registering {
        fn on_end_of_stream(&self) {
            self.hub.add_listener(self.added.clone());
        }
    }

    #[test]
    fn test_listener_can_register_listener() {
        let hub = EventHub::new();
        let added = Arc::new(Recorder::default());
        hub.add_listener(Arc::new(Registering {
            hub: hub.clone(),
            added: added.clone(),
        }));

        hub.emit(SessionEvent::EndOfStream);
        assert_eq!(*added.eos.lock().unwrap(), 0);

        hub.emit(SessionEvent::EndOfStream);
        assert_eq!(*added.eos.lock().unwrap(), 1);
    }

    #[test]
    fn test_queue_drains_in_order() {
        let hub = EventHub::new();
        let mut queue = hub.subscribe();
        hub.emit(SessionEvent::Buffering { percent: 40 });
        hub.emit(SessionEvent::EndOfStream);

        assert_eq!(
            queue.drain(),
            vec![SessionEvent::Buffering { percent: 40 }, SessionEvent::EndOfStream]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_lagging_queue_keeps_newest() {
        let hub = EventHub::new();
        let mut queue = hub.subscribe();
        for percent in 0..(CHANNEL_CAPACITY as i32 + 10) {
            hub.emit(SessionEvent::Buffering { percent });
        }

        let events = queue.drain();
        assert_eq!(events.len(), CHANNEL_CAPACITY);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::Buffering { percent: CHANNEL_CAPACITY as i32 + 9 })
        );
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(SessionEvent::Buffering { percent: 75 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "buffering", "percent": 75}));
    }

    #[tokio::test]
    async fn test_async_recv() {
        let hub = EventHub::new();
        let mut queue = hub.subscribe();
        let emitter = hub.clone();
        std::thread::spawn(move || emitter.emit(SessionEvent::EndOfStream));

        assert_eq!(queue.recv().await, Some(SessionEvent::EndOfStream));
    }
}

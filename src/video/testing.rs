//! In-memory pipeline used by the session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::description::PipelineDescription;
use super::events::{EventQueue, SessionEvent};
use super::overlay::{RenderRect, SurfaceHandle};
use super::pipeline::{BusEvent, OverlayTarget, Pipeline, PipelineLauncher, SurfaceRequestHandler};
use super::state::{PlaybackState, StateChange, StateChangeAck};
use crate::error::{Result, SessionError};

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCall {
    WindowHandle(SurfaceHandle),
    Rect(RenderRect),
    HandleEvents(bool),
    Expose,
}

pub struct RecordingOverlay {
    calls: Arc<Mutex<Vec<OverlayCall>>>,
}

impl RecordingOverlay {
    pub fn new() -> (Self, Arc<Mutex<Vec<OverlayCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (Self { calls: calls.clone() }, calls)
    }
}

impl OverlayTarget for RecordingOverlay {
    fn set_window_handle(&self, handle: SurfaceHandle) {
        self.calls.lock().unwrap().push(OverlayCall::WindowHandle(handle));
    }

    fn set_render_rectangle(&self, rect: RenderRect) -> bool {
        self.calls.lock().unwrap().push(OverlayCall::Rect(rect));
        true
    }

    fn handle_events(&self, enabled: bool) {
        self.calls.lock().unwrap().push(OverlayCall::HandleEvents(enabled));
    }

    fn expose(&self) {
        self.calls.lock().unwrap().push(OverlayCall::Expose);
    }
}

/// Pipeline that completes every transition immediately and posts the
/// matching state-changed notification, like a prerolled GStreamer pipeline.
#[derive(Default)]
pub struct FakePipeline {
    state: Mutex<PlaybackState>,
    pub requested: Mutex<Vec<PlaybackState>>,
    refuse: Mutex<Vec<PlaybackState>>,
    events: Mutex<VecDeque<BusEvent>>,
    ready: Condvar,
    pub position: Mutex<Option<Duration>>,
    pub duration: Mutex<Option<Duration>>,
    handler: Mutex<Option<SurfaceRequestHandler>>,
    pub released: AtomicBool,
}

impl FakePipeline {
    pub fn post(&self, event: BusEvent) {
        self.events.lock().unwrap().push_back(event);
        self.ready.notify_all();
    }

    pub fn refuse(&self, target: PlaybackState) {
        self.refuse.lock().unwrap().push(target);
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.lock().unwrap()
    }

    /// Act as the video sink asking for a window handle. Returns false when
    /// no handler is installed.
    pub fn request_surface(&self, overlay: RecordingOverlay) -> bool {
        match self.handler.lock().unwrap().as_ref() {
            Some(handler) => {
                handler(Box::new(overlay));
                true
            }
            None => false,
        }
    }
}

impl Pipeline for FakePipeline {
    fn set_state(&self, target: PlaybackState) -> StateChangeAck {
        self.requested.lock().unwrap().push(target);
        if self.refuse.lock().unwrap().contains(&target) {
            return StateChangeAck::Failure;
        }

        let old = std::mem::replace(&mut *self.state.lock().unwrap(), target);
        if old != target {
            self.post(BusEvent::StateChanged(StateChange {
                old,
                current: target,
                pending: None,
            }));
        }
        StateChangeAck::Success
    }

    fn current_state(&self, _timeout: Duration) -> PlaybackState {
        self.state()
    }

    fn position(&self) -> Option<Duration> {
        *self.position.lock().unwrap()
    }

    fn duration(&self) -> Option<Duration> {
        *self.duration.lock().unwrap()
    }

    fn next_event(&self, timeout: Duration) -> Option<BusEvent> {
        let events = self.events.lock().unwrap();
        let (mut events, _) = self
            .ready
            .wait_timeout_while(events, timeout, |q| q.is_empty())
            .unwrap();
        events.pop_front()
    }

    fn set_surface_handler(&self, handler: SurfaceRequestHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    fn release(&self) {
        self.handler.lock().unwrap().take();
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Launcher handing out fake pipelines. Descriptions containing `missing`
/// fail as if an element were not installed.
#[derive(Default)]
pub struct FakeLauncher {
    pub launched: Mutex<Vec<Arc<FakePipeline>>>,
}

impl FakeLauncher {
    pub fn last(&self) -> Arc<FakePipeline> {
        self.launched.lock().unwrap().last().cloned().expect("nothing launched")
    }

    pub fn count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }
}

impl PipelineLauncher for FakeLauncher {
    fn launch(&self, description: &PipelineDescription) -> Result<Arc<dyn Pipeline>> {
        if description.as_str().contains("missing") {
            return Err(SessionError::MissingElement {
                description: description.to_string(),
                message: "no element \"missing\"".into(),
            });
        }
        let pipeline = Arc::new(FakePipeline::default());
        self.launched.lock().unwrap().push(pipeline.clone());
        Ok(pipeline)
    }
}

/// Drain `queue` until an event matches or `timeout` passes.
pub fn wait_for_event(
    queue: &mut EventQueue,
    timeout: Duration,
    pred: impl Fn(&SessionEvent) -> bool,
) -> Option<SessionEvent> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(event) = queue.drain().into_iter().find(|e| pred(e)) {
            return Some(event);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    None
}

pub fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

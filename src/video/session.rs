//! Playback Session Controller
//!
//! Owns one pipeline at a time together with the background thread that pops
//! its bus. Bus notifications are handled on that thread (error and
//! end-of-stream force the pipeline back to Ready) and then published on the
//! session's [`EventHub`]. The video sink's window-handle request is answered
//! synchronously on the streaming thread from the current [`OverlayBinding`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::description::PipelineDescription;
use super::events::{EventHub, EventQueue, SessionEvent, SessionListener};
use super::gst_pipeline::GstLauncher;
use super::overlay::{OverlayBinding, RenderRect, SurfaceHandle};
use super::pipeline::{BusEvent, ErrorNotice, OverlayTarget, Pipeline, PipelineLauncher};
use super::state::{PlaybackState, StateChangeAck};
use super::status::{StatusPoller, StatusSample, StatusSource};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared with the bus thread and the streaming-thread surface handler
struct Shared {
    state: Mutex<PlaybackState>,
    overlay: Mutex<OverlayBinding>,
    hub: EventHub,
}

impl Shared {
    fn set_state(&self, state: PlaybackState) {
        *lock(&self.state) = state;
    }

    fn bind_overlay(&self, target: Box<dyn OverlayTarget>) {
        let handle = lock(&self.overlay).bind(target);
        match handle {
            Some(handle) => log::info!("Video overlay bound to surface {}", handle),
            None => log::info!("Video overlay bound without a host surface"),
        }
        self.hub.emit(SessionEvent::SurfaceBound { handle });
    }

    fn handle_bus_event(&self, pipeline: &dyn Pipeline, event: BusEvent, stopping: &AtomicBool) {
        match event {
            BusEvent::Error(ErrorNotice { source, message, debug }) => {
                log::error!(
                    "Error received from element {}: {}",
                    source.as_deref().unwrap_or("<unknown>"),
                    message
                );
                log::error!("Debug info: {}", debug.as_deref().unwrap_or("None"));
                self.return_to_ready(pipeline, stopping);
                self.hub.emit(SessionEvent::Error { source, message, debug });
            }
            BusEvent::EndOfStream => {
                log::info!("End of stream");
                self.return_to_ready(pipeline, stopping);
                self.hub.emit(SessionEvent::EndOfStream);
            }
            BusEvent::StateChanged(change) => {
                log::debug!("State changed: {} -> {}", change.old, change.current);
                self.set_state(change.current);
                self.hub.emit(SessionEvent::StateChanged(change));
            }
            BusEvent::Warning(ErrorNotice { source, message, debug }) => {
                log::warn!(
                    "Warning from element {}: {} ({})",
                    source.as_deref().unwrap_or("<unknown>"),
                    message,
                    debug.as_deref().unwrap_or("no debug info")
                );
                self.hub.emit(SessionEvent::Warning { source, message });
            }
            BusEvent::Buffering(percent) => {
                log::debug!("Buffering {}%", percent);
                self.hub.emit(SessionEvent::Buffering { percent });
            }
            BusEvent::MissingPlugin(name) => {
                log::warn!("Missing plugin: {}", name);
                self.hub.emit(SessionEvent::MissingPlugin { name });
            }
            BusEvent::Application(name) if name == "tags-changed" => {
                log::debug!("Stream tags changed");
                self.hub.emit(SessionEvent::TagsChanged);
            }
            BusEvent::Application(name) => {
                self.hub.emit(SessionEvent::Application { name });
            }
        }
    }

    /// Error and end-of-stream policy. Skipped once teardown has begun so the
    /// pipeline is not pulled back out of Null.
    fn return_to_ready(&self, pipeline: &dyn Pipeline, stopping: &AtomicBool) {
        self.set_state(PlaybackState::Ready);
        if !stopping.load(Ordering::SeqCst) {
            let ack = pipeline.set_state(PlaybackState::Ready);
            if ack.is_failure() {
                log::warn!("Pipeline refused to return to Ready");
            }
        }
    }
}

/// Pipeline currently owned by the session
struct ActivePipeline {
    pipeline: Arc<dyn Pipeline>,
    description: PipelineDescription,
    stopping: Arc<AtomicBool>,
    bus_thread: Option<JoinHandle<()>>,
}

impl ActivePipeline {
    /// Null first, then stop and join the bus loop, then drop bus handlers.
    fn teardown(mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.pipeline.set_state(PlaybackState::Uninitialized);

        if let Some(handle) = self.bus_thread.take() {
            if handle.thread().id() == thread::current().id() {
                log::warn!("Session torn down from its own bus thread; not joining");
            } else if handle.join().is_err() {
                log::error!("Bus thread panicked");
            }
        }

        // The bus thread may have raced a Ready request in after the first Null
        let _ = self.pipeline.set_state(PlaybackState::Uninitialized);
        self.pipeline.release();
        log::info!("Pipeline released: {}", self.description);
    }
}

fn run_bus_loop(
    pipeline: Arc<dyn Pipeline>,
    shared: Arc<Shared>,
    stopping: Arc<AtomicBool>,
    poll_timeout: Duration,
) {
    log::debug!("Bus loop started");
    while !stopping.load(Ordering::SeqCst) {
        if let Some(event) = pipeline.next_event(poll_timeout) {
            shared.handle_bus_event(pipeline.as_ref(), event, &stopping);
        }
    }
    log::debug!("Bus loop stopped");
}

/// Controller for one playback session.
///
/// Listeners run on the bus thread and must not call [`Session::start`] or
/// [`Session::shutdown`]; use the event queue for that.
pub struct Session {
    config: SessionConfig,
    launcher: Arc<dyn PipelineLauncher>,
    shared: Arc<Shared>,
    active: Mutex<Option<ActivePipeline>>,
    lifecycle: Mutex<()>,
}

impl Session {
    pub fn new(config: SessionConfig, launcher: Arc<dyn PipelineLauncher>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PlaybackState::Uninitialized),
            overlay: Mutex::new(OverlayBinding::new(config.handle_overlay_events)),
            hub: EventHub::new(),
        });
        Self {
            config,
            launcher,
            shared,
            active: Mutex::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Session backed by GStreamer. Initializes GStreamer.
    pub fn with_gstreamer(config: SessionConfig) -> Result<Self> {
        let launcher = GstLauncher::new(config.force_aspect_ratio)?;
        Ok(Self::new(config, Arc::new(launcher)))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Build a pipeline from `description` and bring it to Ready (or Playing
    /// with `autoplay`). A previously started pipeline is torn down first.
    pub fn start(&self, description: &str) -> Result<StateChangeAck> {
        let _lifecycle = lock(&self.lifecycle);

        let description = PipelineDescription::parse(description).inspect_err(|e| {
            log::error!("Rejected pipeline description: {}", e);
        })?;

        self.teardown();

        let pipeline = self.launcher.launch(&description).inspect_err(|e| {
            log::error!("Failed to construct pipeline: {}", e);
        })?;

        let shared = self.shared.clone();
        pipeline.set_surface_handler(Box::new(move |target| shared.bind_overlay(target)));

        let stopping = Arc::new(AtomicBool::new(false));
        let bus_thread = {
            let pipeline = pipeline.clone();
            let shared = self.shared.clone();
            let stopping = stopping.clone();
            let timeout = self.config.bus_poll_timeout();
            thread::Builder::new()
                .name("gst-session-bus".to_string())
                .spawn(move || run_bus_loop(pipeline, shared, stopping, timeout))
        };
        let bus_thread = match bus_thread {
            Ok(handle) => handle,
            Err(e) => {
                let _ = pipeline.set_state(PlaybackState::Uninitialized);
                pipeline.release();
                return Err(e.into());
            }
        };

        log::info!("Pipeline started: {}", description);
        *lock(&self.active) = Some(ActivePipeline {
            pipeline: pipeline.clone(),
            description,
            stopping,
            bus_thread: Some(bus_thread),
        });

        let target = if self.config.autoplay {
            PlaybackState::Playing
        } else {
            PlaybackState::Ready
        };
        let ack = pipeline.set_state(target);
        log::info!("Initial transition to {}: {}", target, ack);
        if ack.is_failure() {
            self.teardown();
            return Err(SessionError::StateChange { target });
        }
        Ok(ack)
    }

    pub fn play(&self) -> Result<StateChangeAck> {
        self.request_state(PlaybackState::Playing)
    }

    pub fn pause(&self) -> Result<StateChangeAck> {
        self.request_state(PlaybackState::Paused)
    }

    /// Return to Ready. The pipeline is kept and can be played again.
    pub fn stop(&self) -> Result<StateChangeAck> {
        self.request_state(PlaybackState::Ready)
    }

    fn request_state(&self, target: PlaybackState) -> Result<StateChangeAck> {
        let pipeline = self.pipeline().ok_or(SessionError::NotStarted)?;
        let ack = pipeline.set_state(target);
        log::info!("Requested {}: {}", target, ack);
        Ok(ack)
    }

    /// Record the host surface. Rebinds a live overlay immediately; otherwise
    /// the handle is used when the video sink asks for one.
    pub fn attach_surface(&self, handle: SurfaceHandle) {
        log::debug!("Surface attached: {}", handle);
        let rebound = lock(&self.shared.overlay).attach_surface(handle);
        if rebound {
            self.shared.hub.emit(SessionEvent::SurfaceBound { handle: Some(handle) });
        }
    }

    pub fn set_render_rectangle(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        let rect = RenderRect::new(x, y, width, height)?;
        lock(&self.shared.overlay).set_render_rect(rect);
        Ok(())
    }

    /// Ask the bound sink to redraw its last frame
    pub fn expose(&self) {
        lock(&self.shared.overlay).expose();
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        lock(&self.shared.overlay).surface()
    }

    pub fn is_overlay_bound(&self) -> bool {
        lock(&self.shared.overlay).is_bound()
    }

    /// Last state confirmed by the pipeline
    pub fn state(&self) -> PlaybackState {
        *lock(&self.shared.state)
    }

    pub fn is_started(&self) -> bool {
        lock(&self.active).is_some()
    }

    pub fn description(&self) -> Option<PipelineDescription> {
        lock(&self.active).as_ref().map(|a| a.description.clone())
    }

    /// Sample position, duration and pipeline state. Unknown values are None.
    pub fn poll_status(&self) -> StatusSample {
        let Some(pipeline) = self.pipeline() else {
            return StatusSample::unknown(PlaybackState::Uninitialized);
        };
        StatusSample {
            position: pipeline.position(),
            duration: pipeline.duration(),
            state: pipeline.current_state(self.config.state_query_timeout()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.shared.hub.add_listener(listener);
    }

    pub fn events(&self) -> EventQueue {
        self.shared.hub.subscribe()
    }

    /// Publish a status sample every `poll_interval`. Requires a tokio runtime.
    pub fn start_status_poller(self: &Arc<Self>) -> StatusPoller {
        StatusPoller::spawn(
            self.clone(),
            self.shared.hub.clone(),
            self.config.poll_interval(),
        )
    }

    /// Stop the pipeline and release it. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let _lifecycle = lock(&self.lifecycle);
        self.teardown();
    }

    fn teardown(&self) {
        let active = lock(&self.active).take();
        if let Some(active) = active {
            active.teardown();
            lock(&self.shared.overlay).unbind();
            self.shared.set_state(PlaybackState::Uninitialized);
        }
    }

    fn pipeline(&self) -> Option<Arc<dyn Pipeline>> {
        lock(&self.active).as_ref().map(|a| a.pipeline.clone())
    }
}

impl StatusSource for Session {
    fn poll_status(&self) -> StatusSample {
        Session::poll_status(self)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! Pipeline abstraction
//!
//! The session drives media pipelines through these traits. `gst_pipeline`
//! provides the GStreamer implementation.

use std::sync::Arc;
use std::time::Duration;

use super::description::PipelineDescription;
use super::overlay::{RenderRect, SurfaceHandle};
use super::state::{PlaybackState, StateChange, StateChangeAck};
use crate::error::Result;

/// Error payload posted by a pipeline element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    /// Path of the element that posted the error, if known
    pub source: Option<String>,
    pub message: String,
    pub debug: Option<String>,
}

/// Asynchronous notification popped from a pipeline bus
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Error(ErrorNotice),
    Warning(ErrorNotice),
    EndOfStream,
    /// State change of the top-level element
    StateChanged(StateChange),
    Buffering(i32),
    MissingPlugin(String),
    Application(String),
}

/// Video sink that can render into a host surface
pub trait OverlayTarget: Send {
    fn set_window_handle(&self, handle: SurfaceHandle);

    /// Returns false when the sink rejected the rectangle
    fn set_render_rectangle(&self, rect: RenderRect) -> bool;

    fn handle_events(&self, enabled: bool);

    fn expose(&self);
}

/// Called synchronously on the streaming thread when the video sink asks for
/// a window handle. The binding must be complete when it returns.
pub type SurfaceRequestHandler = Box<dyn Fn(Box<dyn OverlayTarget>) + Send + Sync>;

/// A constructed media pipeline
pub trait Pipeline: Send + Sync {
    fn set_state(&self, target: PlaybackState) -> StateChangeAck;

    /// Current state, waiting at most `timeout` for a pending transition
    fn current_state(&self, timeout: Duration) -> PlaybackState;

    fn position(&self) -> Option<Duration>;

    fn duration(&self) -> Option<Duration>;

    /// Next bus notification, or None if nothing arrived within `timeout`
    fn next_event(&self, timeout: Duration) -> Option<BusEvent>;

    fn set_surface_handler(&self, handler: SurfaceRequestHandler);

    /// Drop any handler installed on the bus. Called once the pipeline is stopped.
    fn release(&self);
}

/// Builds pipelines from descriptions
pub trait PipelineLauncher: Send + Sync {
    fn launch(&self, description: &PipelineDescription) -> Result<Arc<dyn Pipeline>>;
}

//! GStreamer Playback Session
//!
//! This module drives a GStreamer pipeline on behalf of a host window.
//!
//! # Threads
//!
//! - **Host (UI) thread**: calls `start`, `play`, `pause`, `stop`,
//!   `attach_surface`, `set_render_rectangle`, and drains the [`EventQueue`].
//! - **Bus thread**: one per started pipeline. Pops bus messages, applies the
//!   error/end-of-stream policy, records state changes and publishes
//!   [`SessionEvent`]s.
//! - **Streaming threads**: owned by GStreamer. The video sink's
//!   prepare-window-handle request arrives here through the bus sync handler
//!   and is answered before the first frame is drawn.
//!
//! # Teardown
//!
//! The pipeline is set to Null before the bus thread is joined, and the bus
//! handlers are dropped only after that. Host surface and render rectangle
//! survive teardown, so a restarted pipeline renders into the same place.

mod description;
mod events;
mod gst_pipeline;
mod overlay;
mod pipeline;
pub mod probe;
mod session;
mod state;
mod status;

#[cfg(test)]
mod testing;

pub use description::PipelineDescription;
pub use events::{EventHub, EventQueue, SessionEvent, SessionListener};
pub use gst_pipeline::{GstLauncher, GstOverlay, GstPipeline};
pub use overlay::{OverlayBinding, RenderRect, SurfaceHandle};
pub use pipeline::{BusEvent, ErrorNotice, OverlayTarget, Pipeline, PipelineLauncher, SurfaceRequestHandler};
pub use session::Session;
pub use state::{PlaybackState, StateChange, StateChangeAck};
pub use status::{StatusPoller, StatusSample, StatusSource};

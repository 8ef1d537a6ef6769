//! GStreamer pipeline backend
//!
//! Builds pipelines with `playbin` or `gst::parse::launch`, pops bus messages
//! for the session's bus loop, and answers the video sink's
//! prepare-window-handle request from a bus sync handler.

use std::sync::Arc;
use std::time::Duration;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_video as gst_video;
use gstreamer_video::prelude::*;

use super::description::PipelineDescription;
use super::overlay::{RenderRect, SurfaceHandle};
use super::pipeline::{
    BusEvent, ErrorNotice, OverlayTarget, Pipeline, PipelineLauncher, SurfaceRequestHandler,
};
use super::state::{PlaybackState, StateChange, StateChangeAck};
use crate::error::{Result, SessionError};

const TAG_SIGNALS: [&str; 3] = ["video-tags-changed", "audio-tags-changed", "text-tags-changed"];

fn clock_time(timeout: Duration) -> gst::ClockTime {
    gst::ClockTime::from_mseconds(timeout.as_millis() as u64)
}

/// Builds GStreamer pipelines
pub struct GstLauncher {
    force_aspect_ratio: bool,
}

impl GstLauncher {
    /// Initializes GStreamer if not already done
    pub fn new(force_aspect_ratio: bool) -> Result<Self> {
        gst::init()?;
        let (major, minor, micro, _) = gst::version();
        log::debug!("GStreamer {}.{}.{} initialized", major, minor, micro);
        Ok(Self { force_aspect_ratio })
    }
}

impl PipelineLauncher for GstLauncher {
    fn launch(&self, description: &PipelineDescription) -> Result<Arc<dyn Pipeline>> {
        let element = match description {
            PipelineDescription::Uri(uri) => gst::ElementFactory::make("playbin")
                .name("playbin")
                .property("uri", uri.as_str())
                .build()
                .map_err(|e| SessionError::MissingElement {
                    description: description.to_string(),
                    message: e.to_string(),
                })?,
            PipelineDescription::Launch(line) => {
                gst::parse::launch(line).map_err(|e| classify_parse_error(line, &e))?
            }
        };

        let pipeline = GstPipeline::new(element, self.force_aspect_ratio)
            .map_err(|e| SessionError::construction(description.as_str(), e.to_string()))?;
        Ok(Arc::new(pipeline))
    }
}

fn classify_parse_error(line: &str, error: &gst::glib::Error) -> SessionError {
    if error.matches(gst::ParseError::NoSuchElement) {
        SessionError::MissingElement {
            description: line.to_string(),
            message: error.to_string(),
        }
    } else {
        SessionError::construction(line, error.to_string())
    }
}

/// Top-level GStreamer pipeline plus its bus
pub struct GstPipeline {
    pipeline: gst::Pipeline,
    bus: gst::Bus,
    force_aspect_ratio: bool,
}

impl GstPipeline {
    /// Wrap a launched element. A bare element is placed in a new pipeline.
    pub fn new(element: gst::Element, force_aspect_ratio: bool) -> Result<Self, gst::glib::BoolError> {
        let pipeline = match element.downcast::<gst::Pipeline>() {
            Ok(pipeline) => pipeline,
            Err(element) => {
                let pipeline = gst::Pipeline::new();
                pipeline.add(&element)?;
                pipeline
            }
        };

        let bus = pipeline
            .bus()
            .ok_or_else(|| gst::glib::bool_error!("Pipeline has no bus"))?;

        if is_playbin(pipeline.upcast_ref()) {
            connect_tag_signals(pipeline.upcast_ref());
        }

        Ok(Self {
            pipeline,
            bus,
            force_aspect_ratio,
        })
    }

    fn translate(&self, msg: &gst::Message) -> Option<BusEvent> {
        use gst::MessageView;

        match msg.view() {
            MessageView::Error(err) => Some(BusEvent::Error(ErrorNotice {
                source: err.src().map(|s| s.path_string().to_string()),
                message: err.error().to_string(),
                debug: err.debug().map(|d| d.to_string()),
            })),
            MessageView::Warning(warning) => Some(BusEvent::Warning(ErrorNotice {
                source: warning.src().map(|s| s.path_string().to_string()),
                message: warning.error().to_string(),
                debug: warning.debug().map(|d| d.to_string()),
            })),
            MessageView::Eos(_) => Some(BusEvent::EndOfStream),
            MessageView::StateChanged(changed) => {
                // Only care about the top-level element
                if changed.src() != Some(self.pipeline.upcast_ref::<gst::Object>()) {
                    return None;
                }
                Some(BusEvent::StateChanged(StateChange {
                    old: PlaybackState::from_gst(changed.old())?,
                    current: PlaybackState::from_gst(changed.current())?,
                    pending: PlaybackState::from_gst(changed.pending()),
                }))
            }
            MessageView::Buffering(buffering) => Some(BusEvent::Buffering(buffering.percent())),
            MessageView::Application(app) => app
                .structure()
                .map(|s| BusEvent::Application(s.name().to_string())),
            MessageView::Element(element) => {
                let s = element.structure()?;
                if !s.has_name("missing-plugin") {
                    return None;
                }
                let name = s
                    .get::<String>("name")
                    .or_else(|_| s.get::<String>("detail"))
                    .unwrap_or_else(|_| "unknown plugin".to_string());
                Some(BusEvent::MissingPlugin(name))
            }
            _ => None,
        }
    }
}

impl Pipeline for GstPipeline {
    fn set_state(&self, target: PlaybackState) -> StateChangeAck {
        StateChangeAck::from_gst(self.pipeline.set_state(target.to_gst()))
    }

    fn current_state(&self, timeout: Duration) -> PlaybackState {
        let (_, current, _) = self.pipeline.state(clock_time(timeout));
        PlaybackState::from_gst(current).unwrap_or_default()
    }

    fn position(&self) -> Option<Duration> {
        self.pipeline
            .query_position::<gst::ClockTime>()
            .map(|p| Duration::from_nanos(p.nseconds()))
    }

    fn duration(&self) -> Option<Duration> {
        self.pipeline
            .query_duration::<gst::ClockTime>()
            .map(|d| Duration::from_nanos(d.nseconds()))
    }

    fn next_event(&self, timeout: Duration) -> Option<BusEvent> {
        let msg = self.bus.timed_pop(clock_time(timeout))?;
        self.translate(&msg)
    }

    fn set_surface_handler(&self, handler: SurfaceRequestHandler) {
        let force_aspect_ratio = self.force_aspect_ratio;
        self.bus.set_sync_handler(move |_bus, msg| {
            if !gst_video::is_video_overlay_prepare_window_handle_message(msg) {
                return gst::BusSyncReply::Pass;
            }
            match overlay_from_message(msg, force_aspect_ratio) {
                Some(overlay) => handler(Box::new(GstOverlay(overlay))),
                None => log::warn!("Window handle requested by an element without VideoOverlay"),
            }
            gst::BusSyncReply::Drop
        });
    }

    fn release(&self) {
        self.bus.unset_sync_handler();
    }
}

impl Drop for GstPipeline {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

fn is_playbin(element: &gst::Element) -> bool {
    element.factory().is_some_and(|f| f.name().as_str() == "playbin")
}

/// Re-post playbin tag changes as an application message so they are
/// handled on the bus thread rather than the streaming thread.
fn connect_tag_signals(playbin: &gst::Element) {
    for signal in TAG_SIGNALS {
        playbin.connect(signal, false, |values| {
            let playbin = values.first()?.get::<gst::Element>().ok()?;
            let msg = gst::message::Application::builder(gst::Structure::new_empty("tags-changed"))
                .src(&playbin)
                .build();
            if playbin.post_message(msg).is_err() {
                log::debug!("Could not post tags-changed, bus is flushing");
            }
            None
        });
    }
}

fn overlay_from_message(msg: &gst::MessageRef, force_aspect_ratio: bool) -> Option<gst_video::VideoOverlay> {
    let element = msg.src()?.downcast_ref::<gst::Element>()?;

    if force_aspect_ratio && element.find_property("force-aspect-ratio").is_some() {
        element.set_property("force-aspect-ratio", true);
    }

    if let Some(overlay) = element.dynamic_cast_ref::<gst_video::VideoOverlay>() {
        return Some(overlay.clone());
    }

    element
        .downcast_ref::<gst::Bin>()?
        .by_interface(gst_video::VideoOverlay::static_type())?
        .dynamic_cast::<gst_video::VideoOverlay>()
        .ok()
}

/// Video sink implementing `GstVideoOverlay`
pub struct GstOverlay(gst_video::VideoOverlay);

impl OverlayTarget for GstOverlay {
    fn set_window_handle(&self, handle: SurfaceHandle) {
        // SAFETY: the host owns the surface and keeps it alive while attached.
        unsafe { self.0.set_window_handle(handle.0) };
    }

    fn set_render_rectangle(&self, rect: RenderRect) -> bool {
        self.0
            .set_render_rectangle(rect.x, rect.y, rect.width, rect.height)
            .is_ok()
    }

    fn handle_events(&self, enabled: bool) {
        self.0.handle_events(enabled);
    }

    fn expose(&self) {
        self.0.expose();
    }
}

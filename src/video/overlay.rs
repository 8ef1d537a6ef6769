//! Overlay binding
//!
//! Tracks the host surface and render rectangle, and applies them to the
//! video sink once it asks for a window handle. The host may change either at
//! any time; the last value supplied wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pipeline::OverlayTarget;
use crate::error::{Result, SessionError};

/// Native window handle of the host surface. Borrowed from the host window,
/// never released by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle(pub usize);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Where video is composited within the host surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RenderRect {
    /// Covers the whole surface
    pub const FULL_SURFACE: RenderRect = RenderRect { x: 0, y: 0, width: -1, height: -1 };

    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        let full = width == -1 && height == -1;
        if !full && (width <= 0 || height <= 0) {
            return Err(SessionError::InvalidRectangle { width, height });
        }
        Ok(Self { x, y, width, height })
    }

    pub fn is_full_surface(&self) -> bool {
        self.width == -1 && self.height == -1
    }
}

/// Host-side surface state plus the sink it is bound to, if any
#[derive(Default)]
pub struct OverlayBinding {
    surface: Option<SurfaceHandle>,
    rect: Option<RenderRect>,
    target: Option<Box<dyn OverlayTarget>>,
    handle_events: bool,
}

impl OverlayBinding {
    pub fn new(handle_events: bool) -> Self {
        Self {
            handle_events,
            ..Self::default()
        }
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface
    }

    pub fn render_rect(&self) -> Option<RenderRect> {
        self.rect
    }

    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    /// Record the host surface, rebinding a live sink right away. Returns true
    /// when a sink was rebound.
    pub fn attach_surface(&mut self, handle: SurfaceHandle) -> bool {
        self.surface = Some(handle);
        let Some(target) = &self.target else {
            return false;
        };
        log::debug!("Rebinding overlay to surface {}", handle);
        target.set_window_handle(handle);
        if let Some(rect) = self.rect {
            apply_rect(target.as_ref(), rect);
        }
        target.handle_events(self.handle_events);
        target.expose();
        true
    }

    /// Forward geometry to the sink, or keep it until a sink is bound
    pub fn set_render_rect(&mut self, rect: RenderRect) {
        self.rect = Some(rect);
        match &self.target {
            Some(target) => apply_rect(target.as_ref(), rect),
            None => log::debug!("Buffering render rectangle {:?} until overlay is bound", rect),
        }
    }

    /// Bind a sink that asked for a window handle. Returns the surface it was
    /// bound to, or None when the host has not supplied one yet (the sink then
    /// opens its own window).
    pub fn bind(&mut self, target: Box<dyn OverlayTarget>) -> Option<SurfaceHandle> {
        let bound = self.surface;
        match bound {
            Some(handle) => {
                target.set_window_handle(handle);
                if let Some(rect) = self.rect {
                    apply_rect(target.as_ref(), rect);
                }
                target.handle_events(self.handle_events);
            }
            None => log::info!("Video sink requested a surface before one was attached"),
        }
        self.target = Some(target);
        bound
    }

    pub fn expose(&self) {
        if let Some(target) = &self.target {
            target.expose();
        }
    }

    /// Forget the bound sink. Surface and rectangle are kept for the next pipeline.
    pub fn unbind(&mut self) {
        self.target = None;
    }
}

fn apply_rect(target: &dyn OverlayTarget, rect: RenderRect) {
    if !target.set_render_rectangle(rect) {
        log::warn!("Video sink rejected render rectangle {:?}", rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::testing::{OverlayCall, RecordingOverlay};

    #[test]
    fn test_rect_validation() {
        assert!(RenderRect::new(0, 0, 640, 480).is_ok());
        assert!(RenderRect::new(10, 10, -1, -1).unwrap().is_full_surface());
        assert!(matches!(
            RenderRect::new(0, 0, 0, 480),
            Err(SessionError::InvalidRectangle { width: 0, height: 480 })
        ));
        assert!(RenderRect::new(0, 0, 640, -1).is_err());
    }

    #[test]
    fn test_buffered_rect_applied_on_bind() {
        let mut binding = OverlayBinding::new(true);
        let rect = RenderRect::new(5, 5, 320, 240).unwrap();
        assert!(!binding.attach_surface(SurfaceHandle(0x42)));
        binding.set_render_rect(rect);

        let (overlay, calls) = RecordingOverlay::new();
        assert_eq!(binding.bind(Box::new(overlay)), Some(SurfaceHandle(0x42)));

        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                OverlayCall::WindowHandle(SurfaceHandle(0x42)),
                OverlayCall::Rect(rect),
                OverlayCall::HandleEvents(true),
            ]
        );
    }

    #[test]
    fn test_bind_without_surface() {
        let mut binding = OverlayBinding::new(false);
        let (overlay, calls) = RecordingOverlay::new();
        assert_eq!(binding.bind(Box::new(overlay)), None);
        assert!(binding.is_bound());
        assert!(calls.lock().unwrap().is_empty());

        assert!(binding.attach_surface(SurfaceHandle(7)));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                OverlayCall::WindowHandle(SurfaceHandle(7)),
                OverlayCall::HandleEvents(false),
                OverlayCall::Expose,
            ]
        );
    }

    #[test]
    fn test_unbind_keeps_host_state() {
        let mut binding = OverlayBinding::new(true);
        let rect = RenderRect::FULL_SURFACE;
        binding.attach_surface(SurfaceHandle(1));
        binding.set_render_rect(rect);
        let (overlay, _) = RecordingOverlay::new();
        binding.bind(Box::new(overlay));

        binding.unbind();
        assert!(!binding.is_bound());
        assert_eq!(binding.surface(), Some(SurfaceHandle(1)));
        assert_eq!(binding.render_rect(), Some(rect));
    }
}

//! Playback session controller for GStreamer pipelines rendered into a host
//! window surface.

pub mod config;
pub mod error;
pub mod video;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use video::{
    EventQueue, PlaybackState, RenderRect, Session, SessionEvent, SessionListener, StatusSample,
    SurfaceHandle,
};

/// Install the `env_logger` backend. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

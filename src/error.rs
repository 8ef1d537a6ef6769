use thiserror::Error;

use crate::video::PlaybackState;

/// Errors returned by the session controller and its GStreamer backend.
///
/// Failures raised by a running pipeline (decode errors, network errors) are
/// not reported through this type: they arrive as `SessionEvent::Error` on the
/// event queue.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to initialize GStreamer: {0}")]
    Init(#[from] gstreamer::glib::Error),
    #[error("cannot build pipeline from `{description}`: {message}")]
    Construction { description: String, message: String },
    #[error("missing element for `{description}`: {message}")]
    MissingElement { description: String, message: String },
    #[error("pipeline refused transition to {target}")]
    StateChange { target: PlaybackState },
    #[error("no pipeline has been started")]
    NotStarted,
    #[error("invalid render rectangle {width}x{height}")]
    InvalidRectangle { width: i32, height: i32 },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub(crate) fn construction(description: &str, message: impl Into<String>) -> Self {
        SessionError::Construction {
            description: description.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;

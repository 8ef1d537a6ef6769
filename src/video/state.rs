//! Playback state types shared by the session and its pipeline backends.

use std::fmt;

use gstreamer as gst;
use serde::{Deserialize, Serialize};

/// Last-known state of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Uninitialized,
    Ready,
    Paused,
    Playing,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialised",
            Self::Ready => "Ready",
            Self::Paused => "Paused",
            Self::Playing => "Playing",
        }
    }

    /// Map a GStreamer state. `VoidPending` has no counterpart.
    pub fn from_gst(state: gst::State) -> Option<Self> {
        match state {
            gst::State::Null => Some(Self::Uninitialized),
            gst::State::Ready => Some(Self::Ready),
            gst::State::Paused => Some(Self::Paused),
            gst::State::Playing => Some(Self::Playing),
            _ => None,
        }
    }

    pub fn to_gst(self) -> gst::State {
        match self {
            Self::Uninitialized => gst::State::Null,
            Self::Ready => gst::State::Ready,
            Self::Paused => gst::State::Paused,
            Self::Playing => gst::State::Playing,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a state-changed notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub old: PlaybackState,
    pub current: PlaybackState,
    pub pending: Option<PlaybackState>,
}

/// Immediate answer to a state transition request.
///
/// The transition itself is confirmed later by a state-changed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChangeAck {
    Success,
    Async,
    NoPreroll,
    Failure,
}

impl StateChangeAck {
    pub fn from_gst(result: Result<gst::StateChangeSuccess, gst::StateChangeError>) -> Self {
        match result {
            Ok(gst::StateChangeSuccess::Success) => Self::Success,
            Ok(gst::StateChangeSuccess::Async) => Self::Async,
            Ok(gst::StateChangeSuccess::NoPreroll) => Self::NoPreroll,
            Err(_) => Self::Failure,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }
}

impl fmt::Display for StateChangeAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "Success",
            Self::Async => "Async",
            Self::NoPreroll => "NoPreroll",
            Self::Failure => "Failure",
        };
        f.write_str(s)
    }
}

//! Pipeline descriptions
//!
//! A description is either a media URI, played through `playbin`, or a launch
//! line in `gst-launch` syntax such as
//! `udpsrc port=5004 ! application/x-rtp,encoding-name=JPEG,payload=26 ! rtpjpegdepay ! jpegdec ! autovideosink`.

use std::fmt;
use std::path::Path;

use gstreamer::glib;

use crate::error::{Result, SessionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineDescription {
    /// Media URI handed to `playbin`
    Uri(String),
    /// Element graph parsed by `gst::parse::launch`
    Launch(String),
}

impl PipelineDescription {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SessionError::construction(input, "empty pipeline description"));
        }

        let path = Path::new(trimmed);
        if path.is_file() {
            let absolute = path.canonicalize()?;
            let uri = glib::filename_to_uri(&absolute, None)
                .map_err(|e| SessionError::construction(trimmed, e.to_string()))?;
            return Ok(Self::Uri(uri.to_string()));
        }

        if trimmed.split_whitespace().count() == 1 && !trimmed.contains('!') && has_uri_scheme(trimmed) {
            return Ok(Self::Uri(trimmed.to_string()));
        }

        if trimmed.starts_with('!') || trimmed.ends_with('!') || trimmed.contains("! !") {
            return Err(SessionError::construction(trimmed, "dangling link in launch line"));
        }

        Ok(Self::Launch(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Uri(uri) => uri,
            Self::Launch(line) => line,
        }
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, Self::Uri(_))
    }
}

impl fmt::Display for PipelineDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(uri) => write!(f, "playbin uri={}", uri),
            Self::Launch(line) => f.write_str(line),
        }
    }
}

/// `scheme://rest` with an RFC 3986 scheme
fn has_uri_scheme(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_is_detected() {
        let desc = PipelineDescription::parse(
            "http://mirrors.standaloneinstaller.com/video-sample/jellyfish-25-mbps-hd-hevc.mp4",
        )
        .unwrap();
        assert!(desc.is_uri());
        assert!(desc.to_string().starts_with("playbin uri=http://"));
    }

    #[test]
    fn test_launch_lines() {
        let playbin = PipelineDescription::parse("playbin uri=file:///tmp/a.mp4").unwrap();
        assert_eq!(playbin, PipelineDescription::Launch("playbin uri=file:///tmp/a.mp4".into()));

        let rtp = PipelineDescription::parse(
            "  udpsrc port=5004 ! application/x-rtp, encoding-name=JPEG,payload=26 ! rtpjpegdepay ! jpegdec ! autovideosink ",
        )
        .unwrap();
        assert!(!rtp.is_uri());
        assert!(rtp.as_str().starts_with("udpsrc"));
    }

    #[test]
    fn test_local_file_becomes_file_uri() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let desc = PipelineDescription::parse(file.path().to_str().unwrap()).unwrap();
        assert!(desc.as_str().starts_with("file:///"));
    }

    #[test]
    fn test_local_file_with_space_becomes_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my clip.mp4");
        std::fs::write(&path, b"").unwrap();

        let desc = PipelineDescription::parse(path.to_str().unwrap()).unwrap();
        assert!(desc.is_uri());
        assert!(desc.as_str().ends_with("/my%20clip.mp4"));
    }

    #[test]
    fn test_file_uri_escapes_reserved_characters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip#1.mp4");
        std::fs::write(&path, b"").unwrap();

        let desc = PipelineDescription::parse(path.to_str().unwrap()).unwrap();
        assert!(desc.as_str().ends_with("/clip%231.mp4"));
        assert!(!desc.as_str().contains('#'));
    }

    #[test]
    fn test_malformed_descriptions() {
        assert!(matches!(
            PipelineDescription::parse("   "),
            Err(SessionError::Construction { .. })
        ));
        assert!(PipelineDescription::parse("videotestsrc !").is_err());
        assert!(PipelineDescription::parse("! fakesink").is_err());
        assert!(PipelineDescription::parse("videotestsrc ! ! fakesink").is_err());
    }

    #[test]
    fn test_scheme_rules() {
        assert!(has_uri_scheme("rtsp://camera/stream"));
        assert!(has_uri_scheme("svp+x://host"));
        assert!(!has_uri_scheme("://nothing"));
        assert!(!has_uri_scheme("1abc://x"));
        assert!(!has_uri_scheme("http://"));
    }
}

//! GStreamer setup report
//!
//! Lists which of the elements used by the sample graphs are installed: the
//! HTTP HEVC clip played through `playbin` and the UDP/RTP JPEG stream.

use std::fmt::Write;

use gstreamer as gst;

use crate::error::Result;

const VIDEO_SINKS: [(&str, &str); 6] = [
    ("d3dvideosink", "Direct3D Sink (Windows)"),
    ("xvimagesink", "XVideo Sink (X11)"),
    ("waylandsink", "Wayland Direct Sink"),
    ("glimagesink", "OpenGL Image Sink"),
    ("gtksink", "GTK Widget Sink"),
    ("autovideosink", "Auto Video Sink"),
];

const DECODERS: [(&str, &str); 5] = [
    ("nvh265dec", "NVIDIA H.265 (NVDEC)"),
    ("vaapih265dec", "VA-API H.265"),
    ("avdec_h265", "FFmpeg H.265 (Software)"),
    ("avdec_h264", "FFmpeg H.264 (Software)"),
    ("jpegdec", "JPEG"),
];

const SOURCES: [(&str, &str); 5] = [
    ("playbin", "URI playback bin"),
    ("souphttpsrc", "HTTP source"),
    ("udpsrc", "UDP source"),
    ("rtpjpegdepay", "RTP JPEG depayloader"),
    ("timeoverlay", "Timestamp overlay"),
];

/// Whether an element factory with this name is registered
pub fn is_available(name: &str) -> bool {
    gst::ElementFactory::find(name).is_some()
}

fn section(report: &mut String, title: &str, entries: &[(&str, &str)]) {
    let _ = writeln!(report, "\n{}:", title);
    for (name, desc) in entries {
        let _ = writeln!(
            report,
            "  {} [{}]: {}",
            if is_available(name) { "[OK]" } else { "[--]" },
            name,
            desc
        );
    }
}

/// Human-readable report of the GStreamer installation
pub fn system_report() -> Result<String> {
    gst::init()?;

    let mut report = String::new();
    report.push_str("GStreamer Playback Setup Report\n");
    report.push_str("===============================\n\n");

    let (major, minor, micro, nano) = gst::version();
    let _ = writeln!(report, "GStreamer version: {}.{}.{}.{}", major, minor, micro, nano);

    match std::env::var("XDG_SESSION_TYPE") {
        Ok(session) => {
            let _ = writeln!(report, "Session type: {}", session);
        }
        Err(_) => report.push_str("Session type: unknown\n"),
    }

    section(&mut report, "Video Sinks", &VIDEO_SINKS);
    section(&mut report, "Decoders", &DECODERS);
    section(&mut report, "Sources and Filters", &SOURCES);

    report.push_str("\nSample Graphs:\n");
    let http_ok = is_available("playbin") && is_available("souphttpsrc");
    let rtp_ok = ["udpsrc", "rtpjpegdepay", "jpegdec", "autovideosink"]
        .iter()
        .all(|name| is_available(name));
    let _ = writeln!(report, "  {} HTTP playback", if http_ok { "[OK]" } else { "[--]" });
    let _ = writeln!(report, "  {} UDP/RTP JPEG", if rtp_ok { "[OK]" } else { "[--]" });

    Ok(report)
}

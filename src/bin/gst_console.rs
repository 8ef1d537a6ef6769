//! Console playback
//!
//! Run with: cargo run --bin gst-console -- "playbin uri=https://example.com/clip.mp4"
//!
//! Plays a pipeline description until end of stream or the first error, then
//! tears the pipeline down. `--probe` prints the GStreamer setup report instead.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use gst_session::video::probe;
use gst_session::{Session, SessionConfig, SessionEvent};

#[derive(Parser, Debug)]
#[command(name = "gst-console", version, about = "Play a GStreamer pipeline to completion")]
struct Args {
    /// Media URI, file path, or launch line. Defaults to the configured sample.
    description: Option<String>,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the GStreamer setup report and exit
    #[arg(long)]
    probe: bool,

    /// Print the position label on every poll interval
    #[arg(long)]
    status: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

fn print_event(event: &SessionEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => log::warn!("Failed to encode event: {}", e),
        }
        return;
    }
    match event {
        SessionEvent::Status(sample) => println!("{}", sample),
        SessionEvent::StateChanged(change) => println!("State: {} -> {}", change.old, change.current),
        SessionEvent::Error { source, message, debug } => {
            println!(
                "Error received from element {}: {}",
                source.as_deref().unwrap_or("<unknown>"),
                message
            );
            println!("Debug info: {}", debug.as_deref().unwrap_or("None"));
        }
        SessionEvent::EndOfStream => println!("End of stream"),
        other => log::debug!("{:?}", other),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    gst_session::init_logging(log::LevelFilter::Info);
    let args = Args::parse();

    if args.probe {
        return match probe::system_report() {
            Ok(report) => {
                print!("{}", report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let mut config = match SessionConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    config.autoplay = true;

    let description = args
        .description
        .clone()
        .unwrap_or_else(|| config.default_description.clone());

    let session = match Session::with_gstreamer(config) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut events = session.events();
    if let Err(e) = session.start(&description) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let _poller = args.status.then(|| session.start_status_poller());

    let mut failed = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event, args.json);
                match event {
                    SessionEvent::EndOfStream => break,
                    SessionEvent::Error { .. } => {
                        failed = true;
                        break;
                    }
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }
    }

    session.shutdown();
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

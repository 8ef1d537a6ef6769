//! Interactive playback host
//!
//! Run with: cargo run --bin gst-player -- --surface 0x3a00007 /path/to/video.mp4
//!
//! Stands in for a windowed player: stdin commands play the role of the
//! Play/Pause/Stop buttons and of window geometry changes, and the status
//! label is printed on every poll.
//!
//! Commands: play, pause, stop, rect <x> <y> <w> <h>, surface <handle>,
//! expose, status, restart [description], quit

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use gst_session::{Session, SessionConfig, SessionEvent, SurfaceHandle};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "gst-player", version, about = "Drive a GStreamer playback session from stdin")]
struct Args {
    /// Media URI, file path, or launch line. Defaults to the configured sample.
    description: Option<String>,

    /// Native window handle to render into (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_handle)]
    surface: Option<SurfaceHandle>,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

fn parse_handle(s: &str) -> Result<SurfaceHandle, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse::<usize>(),
    };
    parsed
        .map(SurfaceHandle)
        .map_err(|e| format!("invalid window handle `{}`: {}", s, e))
}

enum Command {
    Play,
    Pause,
    Stop,
    Rect(i32, i32, i32, i32),
    Surface(SurfaceHandle),
    Expose,
    Status,
    Restart(Option<String>),
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };

    match verb {
        "play" => Ok(Command::Play),
        "pause" => Ok(Command::Pause),
        "stop" => Ok(Command::Stop),
        "expose" => Ok(Command::Expose),
        "status" => Ok(Command::Status),
        "quit" | "exit" => Ok(Command::Quit),
        "surface" => {
            let handle = words.next().ok_or("usage: surface <handle>")?;
            parse_handle(handle).map(Command::Surface)
        }
        "rect" => {
            let values: Vec<i32> = words
                .map(|w| w.parse::<i32>().map_err(|e| format!("bad number `{}`: {}", w, e)))
                .collect::<Result<_, _>>()?;
            match values[..] {
                [x, y, w, h] => Ok(Command::Rect(x, y, w, h)),
                _ => Err("usage: rect <x> <y> <w> <h>".to_string()),
            }
        }
        "restart" => {
            let rest = line.trim_start().strip_prefix("restart").unwrap_or("").trim();
            Ok(Command::Restart((!rest.is_empty()).then(|| rest.to_string())))
        }
        other => Err(format!("unknown command `{}`", other)),
    }
}

/// Returns false when the host should exit
fn run_command(session: &Session, command: Command, description: &mut String) -> bool {
    let outcome = match command {
        Command::Play => session.play().map(|ack| println!("{}", ack)),
        Command::Pause => session.pause().map(|ack| println!("{}", ack)),
        Command::Stop => session.stop().map(|ack| println!("{}", ack)),
        Command::Rect(x, y, w, h) => session.set_render_rectangle(x, y, w, h),
        Command::Surface(handle) => {
            session.attach_surface(handle);
            Ok(())
        }
        Command::Expose => {
            session.expose();
            Ok(())
        }
        Command::Status => {
            println!("{}", session.poll_status());
            Ok(())
        }
        Command::Restart(next) => {
            if let Some(next) = next {
                *description = next;
            }
            session.start(description).map(|ack| println!("{}", ack))
        }
        Command::Quit => return false,
    };

    if let Err(e) = outcome {
        eprintln!("{}", e);
    }
    true
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
        SessionEvent::Error { message, .. } => println!("Error: {}", message),
        SessionEvent::EndOfStream => println!("End of stream"),
        SessionEvent::SurfaceBound { handle: Some(handle) } => println!("Rendering into {}", handle),
        SessionEvent::SurfaceBound { handle: None } => println!("Rendering into a sink-owned window"),
        SessionEvent::MissingPlugin { name } => println!("Missing plugin: {}", name),
        _ => {}
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    gst_session::init_logging(log::LevelFilter::Info);
    let args = Args::parse();

    let config = match SessionConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut description = args
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

    if let Some(handle) = args.surface {
        session.attach_surface(handle);
    }

    let mut events = session.events();
    if let Err(e) = session.start(&description) {
        eprintln!("{}", e);
    }
    let _poller = session.start_status_poller();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => {
                        // Commands may block briefly on state changes
                        let session = session.clone();
                        let mut current = description.clone();
                        let result = tokio::task::spawn_blocking(move || {
                            let keep_running = run_command(&session, command, &mut current);
                            (keep_running, current)
                        })
                        .await;
                        match result {
                            Ok((true, current)) => description = current,
                            Ok((false, _)) => break,
                            Err(e) => {
                                log::error!("Command task failed: {}", e);
                                break;
                            }
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event, args.json);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown();
    ExitCode::SUCCESS
}

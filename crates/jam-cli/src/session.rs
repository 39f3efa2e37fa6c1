//! The stand-in host: a clock, stdin and a file watcher driving one bridge.
//!
//! All inputs are serialized onto the calling thread through one crossbeam
//! channel, so the bridge only ever sees one message at a time.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use jam_core::{Bridge, HostMessage, HostOutlets, InfoEvent, OutboundMessage};
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// How often the watcher polls the script's modification time.
const WATCH_INTERVAL: Duration = Duration::from_millis(500);

/// Longest wait between two ticks. Extreme tempos are clamped to this so
/// inputs keep being served.
const MAX_TICK_PERIOD: Duration = Duration::from_secs(60);

/// Outlets that print messages and info events to stdout and console
/// lines to stderr.
pub struct ConsoleOutlets;

impl HostOutlets for ConsoleOutlets {
    fn message(&self, message: OutboundMessage) {
        println!("{}", message);
    }

    fn info(&self, event: InfoEvent) {
        println!("info {}", event);
    }

    fn post(&self, line: &str) {
        eprintln!("{}", line);
    }
}

/// Something that happened outside the clock.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A line of host message text.
    Line(String),
    /// The watched script changed on disk.
    Reload,
    /// Stop the session.
    Quit,
}

/// Render `ticks` ticks as fast as possible.
pub fn run_offline(bridge: &mut Bridge, ticks: u64) {
    log::info!("Rendering {} ticks", ticks);
    for _ in 0..ticks {
        bridge.tick();
    }
}

/// Tick in real time until a [`Input::Quit`] arrives, handling inputs
/// between ticks.
///
/// The next tick is scheduled from the previous deadline rather than from
/// the current time, so slow handlers do not accumulate drift.
pub fn run_realtime(bridge: &mut Bridge, script: &Path, inputs: &Receiver<Input>) {
    let mut next_tick = Instant::now();
    loop {
        match inputs.recv_deadline(next_tick) {
            Ok(Input::Line(line)) => handle_line(bridge, &line),
            Ok(Input::Reload) => {
                log::info!("File changed, reloading...");
                if let Err(e) = bridge.load(script) {
                    log::error!("Reload failed: {}", e);
                }
            }
            Ok(Input::Quit) => break,
            Err(RecvTimeoutError::Timeout) => {
                bridge.tick();
                next_tick += tick_period(bridge.tick_period_secs());
                // Skip ticks that are hopelessly late instead of bursting.
                let now = Instant::now();
                if next_tick + Duration::from_secs(1) < now {
                    log::warn!("Clock fell behind, skipping ahead");
                    next_tick = now;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// The wait before the next tick, at most [`MAX_TICK_PERIOD`].
fn tick_period(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs)
        .map_or(MAX_TICK_PERIOD, |period| period.min(MAX_TICK_PERIOD))
}

/// Parse and deliver one line of host message text.
pub fn handle_line(bridge: &mut Bridge, line: &str) {
    let Some(message) = HostMessage::parse(line) else {
        log::debug!("ignoring input '{}'", line.trim());
        return;
    };
    if let Err(e) = bridge.handle(message) {
        log::error!("{}", e);
    }
}

/// Forward stdin lines until EOF. `quit` ends the session.
pub fn spawn_stdin_reader(tx: Sender<Input>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let input = if line.trim() == "quit" {
                Input::Quit
            } else {
                Input::Line(line)
            };
            if tx.send(input).is_err() {
                break;
            }
        }
        log::debug!("stdin closed");
    });
}

/// Send [`Input::Reload`] whenever the modification time of `file` changes.
pub fn spawn_watcher(file: PathBuf, tx: Sender<Input>) {
    std::thread::spawn(move || {
        let mut last_modified = modified(&file);
        loop {
            std::thread::sleep(WATCH_INTERVAL);
            let current = modified(&file);
            if current != last_modified {
                last_modified = current;
                if tx.send(Input::Reload).is_err() {
                    break;
                }
            }
        }
    });
}

fn modified(file: &Path) -> Option<SystemTime> {
    fs::metadata(file).ok().and_then(|m| m.modified().ok())
}

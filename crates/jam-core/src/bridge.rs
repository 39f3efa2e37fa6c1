//! One bridge instance per host object.
//!
//! The bridge owns the transport and the script host, and is the single
//! entry point for everything the host sends: ticks, event lists and the
//! configuration messages `load`, `bpm`, `tpb` and `reset`.

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::host::ScriptHost;
use crate::io::{read, write};
use crate::message::{Atom, HostMessage, InfoEvent};
use crate::outlets::HostOutlets;
use crate::router::route;
use crate::timing::Transport;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// A scripting bridge: clock state, one interpreter and its outlets.
pub struct Bridge {
    name: String,
    transport: Arc<RwLock<Transport>>,
    host: ScriptHost,
    outlets: Arc<dyn HostOutlets>,
}

impl Bridge {
    /// Create a bridge with no script loaded.
    pub fn new(config: BridgeConfig, outlets: Arc<dyn HostOutlets>) -> Self {
        let transport = Arc::new(RwLock::new(Transport::new(
            config.ticks_per_beat,
            config.beats_per_minute,
        )));
        let host = ScriptHost::new(&config, transport.clone(), outlets.clone());

        let bridge = Self {
            name: config.name,
            transport,
            host,
            outlets,
        };
        bridge.post(&format!(
            "created with tpb={} bpm={}",
            bridge.ticks_per_beat(),
            bridge.beats_per_minute()
        ));
        bridge
    }

    /// Handle one host message.
    ///
    /// Only a failed `load` returns an error; everything else is contained.
    pub fn handle(&mut self, message: HostMessage) -> Result<()> {
        match message {
            HostMessage::Bang => self.tick(),
            HostMessage::List(atoms) => self.list(&atoms),
            HostMessage::Load(path) => return self.load(path),
            HostMessage::Bpm(bpm) => self.set_beats_per_minute(bpm),
            HostMessage::Tpb(tpb) => self.set_ticks_per_beat(tpb),
            HostMessage::Reset => self.reset(),
        }
        Ok(())
    }

    /// One clock tick.
    pub fn tick(&mut self) {
        self.host.dispatch_tick();
    }

    /// A tagged event list. Empty lists and untagged lists are dropped.
    pub fn list(&mut self, atoms: &[Atom]) {
        match route(atoms) {
            Some(route) => self.host.dispatch_event(&route.command, &route.args),
            None => log::debug!("dropping untagged list"),
        }
    }

    /// Load or reload a script.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.host.load(path)
    }

    /// Set the tempo. Non-positive values are ignored.
    pub fn set_beats_per_minute(&mut self, bpm: f64) {
        if !write(&self.transport).set_beats_per_minute(bpm) {
            log::debug!("ignoring bpm {}", bpm);
            return;
        }
        self.host.io().refresh_tempo();
        self.post(&format!("bpm set to {}", bpm));
    }

    /// Set the resolution. Non-positive values are ignored.
    pub fn set_ticks_per_beat(&mut self, tpb: f64) {
        if !write(&self.transport).set_ticks_per_beat(tpb) {
            log::debug!("ignoring tpb {}", tpb);
            return;
        }
        self.host.io().refresh_tempo();
        self.post(&format!("tpb set to {}", tpb));
    }

    /// Rewind the tick counter.
    pub fn reset(&mut self) {
        write(&self.transport).reset();
        self.host.io().refresh_tick();
        self.post("reset counters");
        self.outlets.info(InfoEvent::Reset);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ticks_per_beat(&self) -> f64 {
        read(&self.transport).ticks_per_beat()
    }

    pub fn beats_per_minute(&self) -> f64 {
        read(&self.transport).beats_per_minute()
    }

    /// Current value of the tick counter.
    pub fn tick_count(&self) -> u64 {
        read(&self.transport).tick()
    }

    /// Length of one tick in seconds at the current tempo.
    pub fn tick_period_secs(&self) -> f64 {
        read(&self.transport).tick_period_secs()
    }

    /// The script host, for inspection.
    pub fn host(&self) -> &ScriptHost {
        &self.host
    }

    fn post(&self, text: &str) {
        self.outlets.post(&format!("{}: {}", self.name, text));
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.post("freed");
    }
}

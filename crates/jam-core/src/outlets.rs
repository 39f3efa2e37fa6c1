//! Outbound sinks of a bridge.
//!
//! A bridge talks to its host through three channels: the primary outlet for
//! musical and raw messages, the secondary outlet for status events, and the
//! diagnostics console. [`HostOutlets`] abstracts all three so the bridge never
//! depends on how the host physically delivers them.

use crate::message::{InfoEvent, OutboundMessage};
use crossbeam_channel::{Receiver, Sender};

/// The host side of a bridge's outputs.
///
/// Implementations must not block: they are called synchronously from inside
/// script handlers.
pub trait HostOutlets: Send + Sync {
    /// Deliver a message on the primary outlet.
    fn message(&self, message: OutboundMessage);

    /// Deliver a status event on the secondary outlet.
    fn info(&self, event: InfoEvent);

    /// Write one line to the diagnostics console.
    fn post(&self, line: &str);
}

/// Everything a [`ChannelOutlets`] forwards, tagged by outlet.
#[derive(Clone, Debug, PartialEq)]
pub enum OutletEvent {
    Message(OutboundMessage),
    Info(InfoEvent),
    Post(String),
}

/// Outlets that forward every output over an unbounded crossbeam channel.
#[derive(Clone, Debug)]
pub struct ChannelOutlets {
    tx: Sender<OutletEvent>,
}

impl ChannelOutlets {
    /// Create the outlets together with the receiving end.
    pub fn new() -> (Self, Receiver<OutletEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    fn send(&self, event: OutletEvent) {
        // A dropped receiver means nobody is listening anymore.
        if self.tx.send(event).is_err() {
            log::trace!("outlet receiver dropped");
        }
    }
}

impl HostOutlets for ChannelOutlets {
    fn message(&self, message: OutboundMessage) {
        self.send(OutletEvent::Message(message));
    }

    fn info(&self, event: InfoEvent) {
        self.send(OutletEvent::Info(event));
    }

    fn post(&self, line: &str) {
        self.send(OutletEvent::Post(line.to_string()));
    }
}

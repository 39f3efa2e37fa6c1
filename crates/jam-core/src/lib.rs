//! jam Core - a scripting bridge between a host sequencer and Rhai scripts.
//!
//! The host keeps control of time and I/O: it delivers ticks and event lists,
//! and receives notes, controller changes and raw lists back. Pattern logic
//! lives in a user script that evaluates to an object map of handlers.
//!
//! - **Timing** - interval pulses and note durations from ticks, tpb and bpm
//! - **Messages** - atoms, inbound host messages, outbound messages
//! - **Io** - the capability object scripts emit messages through
//! - **Host** - interpreter lifecycle, dispatch and error containment
//! - **Bridge** - one instance per host object, the message entry point
//!
//! # Architecture
//!
//! Every host message enters through [`Bridge::handle`]. Ticks and event
//! lists are routed to the [`ScriptHost`], which calls the script's handlers
//! with an [`Io`] object. `io` operations turn into [`OutboundMessage`]s that
//! leave through the bridge's [`HostOutlets`].

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod io;
pub mod marshal;
pub mod message;
pub mod outlets;
pub mod router;
pub mod timing;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{Result, ScriptError};
pub use host::ScriptHost;
pub use io::Io;
pub use message::{Atom, HostMessage, InfoEvent, OutboundMessage};
pub use outlets::{ChannelOutlets, HostOutlets, OutletEvent};
pub use router::{route, Route};
pub use timing::{Transport, DEFAULT_BEATS_PER_MINUTE, DEFAULT_TICKS_PER_BEAT};

//! The `io` capability object handed to scripts.
//!
//! `io` is the script's only window on the host: it exposes the clock state as
//! properties (`tpb`, `bpm`, `tc`, `ch`) and four operations that emit host
//! messages (`noteout`, `cltout`, `msgout`) or test the clock (`on`).
//!
//! Every [`Io`] carries shared handles to the transport and outlets of the
//! bridge that created it, so a script can never address another bridge.
//! Cloning an `Io` (which Rhai does whenever it passes it around) shares the
//! same underlying state.
//!
//! ```rhai
//! fn tick(io) {
//!     if io.on(1.0, 0.0) {
//!         io.ch = 10;
//!         io.noteout(36, 100, 0.25);
//!     }
//! }
//! ```

use crate::marshal::{self, check_integer, opt_number};
use crate::message::OutboundMessage;
use crate::outlets::HostOutlets;
use crate::timing::{self, Transport};
use rhai::{Dynamic, Engine, EvalAltResult};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Upper bound on the number of arguments `msgout` accepts.
pub const MSGOUT_MAX_ARGS: usize = 16;

/// Script-visible properties of `io`.
///
/// Scripts may assign anything to these; the bridge only refreshes `tc`
/// before each dispatch and `tpb`/`bpm` when the host changes them.
#[derive(Clone, Debug)]
struct IoFields {
    tpb: Dynamic,
    bpm: Dynamic,
    tc: Dynamic,
    ch: Dynamic,
}

/// The capability object passed to every handler.
#[derive(Clone)]
pub struct Io {
    transport: Arc<RwLock<Transport>>,
    fields: Arc<RwLock<IoFields>>,
    outlets: Arc<dyn HostOutlets>,
}

impl fmt::Debug for Io {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Io").field("fields", &*read(&self.fields)).finish()
    }
}

impl Io {
    /// Create a fresh capability object on channel 1.
    pub fn new(transport: Arc<RwLock<Transport>>, outlets: Arc<dyn HostOutlets>) -> Self {
        let fields = {
            let t = read(&transport);
            IoFields {
                tpb: Dynamic::from_float(t.ticks_per_beat()),
                bpm: Dynamic::from_float(t.beats_per_minute()),
                tc: Dynamic::from_int(t.tick() as i64),
                ch: Dynamic::from_int(1),
            }
        };
        Self {
            transport,
            fields: Arc::new(RwLock::new(fields)),
            outlets,
        }
    }

    /// Copy the transport's tick counter into `io.tc`.
    pub fn refresh_tick(&self) {
        let tick = read(&self.transport).tick();
        write(&self.fields).tc = Dynamic::from_int(tick as i64);
    }

    /// Copy the transport's tempo settings into `io.tpb` and `io.bpm`.
    pub fn refresh_tempo(&self) {
        let (tpb, bpm) = {
            let t = read(&self.transport);
            (t.ticks_per_beat(), t.beats_per_minute())
        };
        let mut fields = write(&self.fields);
        fields.tpb = Dynamic::from_float(tpb);
        fields.bpm = Dynamic::from_float(bpm);
    }

    /// The channel scripts currently emit on.
    pub fn channel(&self) -> i64 {
        marshal::coerce_integer(&read(&self.fields).ch)
    }

    // === Properties ===

    pub fn get_tpb(&mut self) -> Dynamic {
        read(&self.fields).tpb.clone()
    }

    pub fn set_tpb(&mut self, value: Dynamic) {
        write(&self.fields).tpb = value;
    }

    pub fn get_bpm(&mut self) -> Dynamic {
        read(&self.fields).bpm.clone()
    }

    pub fn set_bpm(&mut self, value: Dynamic) {
        write(&self.fields).bpm = value;
    }

    pub fn get_tc(&mut self) -> Dynamic {
        read(&self.fields).tc.clone()
    }

    pub fn set_tc(&mut self, value: Dynamic) {
        write(&self.fields).tc = value;
    }

    pub fn get_ch(&mut self) -> Dynamic {
        read(&self.fields).ch.clone()
    }

    pub fn set_ch(&mut self, value: Dynamic) {
        write(&self.fields).ch = value;
    }

    // === Operations ===

    /// Emit a note, timed when `duration_beats` is positive.
    pub fn noteout(
        &mut self,
        note: Dynamic,
        velocity: Dynamic,
        duration_beats: Dynamic,
    ) -> Result<(), Box<EvalAltResult>> {
        let note = check_integer("noteout", 1, &note).map_err(|e| e.into_eval_error())?;
        let velocity = check_integer("noteout", 2, &velocity).map_err(|e| e.into_eval_error())?;
        let duration_beats =
            opt_number("noteout", 3, &duration_beats, 0.0).map_err(|e| e.into_eval_error())?;
        let channel = self.channel();
        let bpm = read(&self.transport).beats_per_minute();

        let message = match timing::beats_to_duration_ms(duration_beats, bpm) {
            Some(duration_ms) => OutboundMessage::TimedNote {
                note,
                velocity,
                duration_ms,
                channel,
            },
            None => OutboundMessage::Note {
                note,
                velocity,
                channel,
            },
        };
        log::trace!("noteout: {}", message);
        self.outlets.message(message);
        Ok(())
    }

    /// Emit a controller change on the current channel.
    pub fn cltout(&mut self, controller: Dynamic, value: Dynamic) -> Result<(), Box<EvalAltResult>> {
        let controller = check_integer("cltout", 1, &controller).map_err(|e| e.into_eval_error())?;
        let value = check_integer("cltout", 2, &value).map_err(|e| e.into_eval_error())?;
        let message = OutboundMessage::Control {
            controller,
            value,
            channel: self.channel(),
        };
        log::trace!("cltout: {}", message);
        self.outlets.message(message);
        Ok(())
    }

    /// Emit an arbitrary list. An empty argument list emits nothing.
    pub fn msgout(&mut self, args: Vec<Dynamic>) {
        if args.is_empty() {
            return;
        }
        let atoms = args.iter().map(marshal::dynamic_to_atom).collect();
        self.outlets.message(OutboundMessage::Raw(atoms));
    }

    /// Whether the current tick starts an interval of `interval_beats`,
    /// shifted by `offset_beats`.
    pub fn on(&mut self, interval_beats: Dynamic, offset_beats: Dynamic) -> Result<bool, Box<EvalAltResult>> {
        let interval = opt_number("on", 1, &interval_beats, 1.0).map_err(|e| e.into_eval_error())?;
        let offset = opt_number("on", 2, &offset_beats, 0.0).map_err(|e| e.into_eval_error())?;
        let t = read(&self.transport);
        Ok(timing::is_interval_start(
            t.tick(),
            t.ticks_per_beat(),
            interval,
            offset,
        ))
    }
}

/// Register `msgout` for every arity from zero up to [`MSGOUT_MAX_ARGS`].
///
/// Rhai functions have a fixed arity, so each one gets its own overload.
macro_rules! register_msgout {
    ($engine:expr, $($arg:ident),*) => {
        $engine.register_fn("msgout", |io: &mut Io, $($arg: Dynamic),*| io.msgout(vec![$($arg),*]));
    };
}

/// Register the `Io` type, its properties and operations.
pub fn register(engine: &mut Engine) {
    engine.register_type_with_name::<Io>("Io");

    engine.register_get_set("tpb", Io::get_tpb, Io::set_tpb);
    engine.register_get_set("bpm", Io::get_bpm, Io::set_bpm);
    engine.register_get_set("tc", Io::get_tc, Io::set_tc);
    engine.register_get_set("ch", Io::get_ch, Io::set_ch);

    engine.register_fn("noteout", |io: &mut Io, note: Dynamic, velocity: Dynamic| {
        io.noteout(note, velocity, Dynamic::UNIT)
    });
    engine.register_fn("noteout", Io::noteout);
    engine.register_fn("cltout", Io::cltout);

    engine.register_fn("on", |io: &mut Io| io.on(Dynamic::UNIT, Dynamic::UNIT));
    engine.register_fn("on", |io: &mut Io, interval: Dynamic| io.on(interval, Dynamic::UNIT));
    engine.register_fn("on", Io::on);

    engine.register_fn("msgout", |io: &mut Io| io.msgout(Vec::new()));
    register_msgout!(engine, a1);
    register_msgout!(engine, a1, a2);
    register_msgout!(engine, a1, a2, a3);
    register_msgout!(engine, a1, a2, a3, a4);
    register_msgout!(engine, a1, a2, a3, a4, a5);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8, a9);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14, a15);
    register_msgout!(engine, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14, a15, a16);
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Atom;
    use crate::outlets::{ChannelOutlets, OutletEvent};
    use crossbeam_channel::Receiver;

    fn io_at(tpb: f64, bpm: f64) -> (Io, Arc<RwLock<Transport>>, Receiver<OutletEvent>) {
        let (outlets, rx) = ChannelOutlets::new();
        let transport = Arc::new(RwLock::new(Transport::new(tpb, bpm)));
        (Io::new(transport.clone(), Arc::new(outlets)), transport, rx)
    }

    fn messages(rx: &Receiver<OutletEvent>) -> Vec<OutboundMessage> {
        rx.try_iter()
            .filter_map(|event| match event {
                OutletEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_fresh_io_fields() {
        let (mut io, _, _) = io_at(4.0, 120.0);
        assert_eq!(io.get_tpb().as_float(), Ok(4.0));
        assert_eq!(io.get_bpm().as_float(), Ok(120.0));
        assert_eq!(io.get_tc().as_int(), Ok(0));
        assert_eq!(io.get_ch().as_int(), Ok(1));
    }

    #[test]
    fn test_timed_note() {
        let (mut io, _, rx) = io_at(4.0, 120.0);
        io.noteout(Dynamic::from_int(60), Dynamic::from_int(100), Dynamic::from_float(0.5))
            .unwrap();
        assert_eq!(
            messages(&rx),
            vec![OutboundMessage::TimedNote {
                note: 60,
                velocity: 100,
                duration_ms: 250.0,
                channel: 1
            }]
        );
    }

    #[test]
    fn test_untimed_note_uses_current_channel() {
        let (mut io, _, rx) = io_at(4.0, 120.0);
        io.set_ch(Dynamic::from_int(3));
        io.noteout(Dynamic::from_int(64), Dynamic::from_int(0), Dynamic::from_int(0))
            .unwrap();
        io.noteout(Dynamic::from_int(64), Dynamic::from_int(0), Dynamic::from_float(-1.0))
            .unwrap();
        let expected = OutboundMessage::Note {
            note: 64,
            velocity: 0,
            channel: 3,
        };
        assert_eq!(messages(&rx), vec![expected.clone(), expected]);
    }

    #[test]
    fn test_noteout_rejects_fractional_note() {
        let (mut io, _, rx) = io_at(4.0, 120.0);
        let err = io
            .noteout(Dynamic::from_float(60.5), Dynamic::from_int(100), Dynamic::UNIT)
            .unwrap_err();
        assert!(err.to_string().contains("bad argument #1 to 'noteout'"));
        assert!(messages(&rx).is_empty());
    }

    #[test]
    fn test_cltout() {
        let (mut io, _, rx) = io_at(4.0, 120.0);
        io.set_ch(Dynamic::from_float(2.0));
        io.cltout(Dynamic::from_int(7), Dynamic::from_int(64)).unwrap();
        assert_eq!(
            messages(&rx),
            vec![OutboundMessage::Control {
                controller: 7,
                value: 64,
                channel: 2
            }]
        );
        assert!(io.cltout(Dynamic::from_int(7), "loud".into()).is_err());
    }

    #[test]
    fn test_msgout_classifies_arguments() {
        let (mut io, _, rx) = io_at(4.0, 120.0);
        io.msgout(vec![]);
        io.msgout(vec![Dynamic::from_int(1), "a".into(), Dynamic::from_bool(true)]);
        assert_eq!(
            messages(&rx),
            vec![OutboundMessage::Raw(vec![
                Atom::Float(1.0),
                Atom::symbol("a"),
                Atom::symbol("nil"),
            ])]
        );
    }

    #[test]
    fn test_on_reads_shared_transport() {
        let (mut io, transport, _) = io_at(4.0, 120.0);
        let mut fired = Vec::new();
        for _ in 0..9 {
            let tick = write(&transport).tick();
            if io.on(Dynamic::UNIT, Dynamic::UNIT).unwrap() {
                fired.push(tick);
            }
            write(&transport).advance();
        }
        assert_eq!(fired, vec![1, 5]);
        assert!(io.on("x".into(), Dynamic::UNIT).is_err());
    }

    #[test]
    fn test_refresh_tick_and_tempo() {
        let (mut io, transport, _) = io_at(4.0, 120.0);
        {
            let mut t = write(&transport);
            t.advance();
            t.advance();
            t.set_beats_per_minute(90.0);
        }
        io.refresh_tick();
        assert_eq!(io.get_tc().as_int(), Ok(2));
        assert_eq!(io.get_bpm().as_float(), Ok(120.0));
        io.refresh_tempo();
        assert_eq!(io.get_bpm().as_float(), Ok(90.0));
    }

    #[test]
    fn test_clones_share_state() {
        let (io, _, _) = io_at(4.0, 120.0);
        let mut other = io.clone();
        other.set_ch(Dynamic::from_int(9));
        assert_eq!(io.channel(), 9);
    }
}

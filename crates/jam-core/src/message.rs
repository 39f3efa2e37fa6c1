//! Host-native messages flowing in and out of a bridge.
//!
//! The host speaks in flat lists of atoms, the way a Pd patch does. Inbound
//! lists are wrapped in [`HostMessage`]; script output is produced as typed
//! [`OutboundMessage`] values that know how to flatten themselves back into
//! atoms for the primary outlet, while [`InfoEvent`]s go to the secondary one.

use std::fmt;
use std::path::PathBuf;

/// One element of a host message list.
#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    /// A numeric value.
    Float(f64),
    /// A text value.
    Symbol(String),
    /// A `;` separator. Neither numeric nor text.
    Semi,
    /// A `,` separator. Neither numeric nor text.
    Comma,
}

impl Atom {
    /// Parse a single whitespace-free token.
    pub fn parse(token: &str) -> Self {
        match token {
            ";" => Atom::Semi,
            "," => Atom::Comma,
            _ => match token.parse::<f64>() {
                Ok(value) if value.is_finite() => Atom::Float(value),
                _ => Atom::Symbol(token.to_string()),
            },
        }
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Atom::Symbol(text.into())
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Atom::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Symbol(text) => Some(text),
            _ => None,
        }
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Float(value)
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Atom::Float(value as f64)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Symbol(value.to_string())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Integral floats print without a fractional part, like Pd does.
            Atom::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Atom::Float(value) => write!(f, "{}", value),
            Atom::Symbol(text) => write!(f, "{}", text),
            Atom::Semi => write!(f, ";"),
            Atom::Comma => write!(f, ","),
        }
    }
}

/// Format a list of atoms separated by single spaces.
pub fn format_atoms(atoms: &[Atom]) -> String {
    atoms
        .iter()
        .map(|atom| atom.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Messages the host delivers to a bridge.
#[derive(Clone, Debug, PartialEq)]
pub enum HostMessage {
    /// One clock tick.
    Bang,
    /// A tagged event list. The first atom names the command.
    List(Vec<Atom>),
    /// Load (or reload) a script file.
    Load(PathBuf),
    /// Set the tempo in beats per minute.
    Bpm(f64),
    /// Set the resolution in ticks per beat.
    Tpb(f64),
    /// Rewind the tick counter.
    Reset,
}

impl HostMessage {
    /// Parse a Pd-style text message.
    ///
    /// `bang`, `reset`, `load <path>`, `bpm <x>` and `tpb <x>` are host
    /// methods. `list <atoms...>` and any other line become a [`HostMessage::List`].
    /// Returns `None` for blank lines and for methods missing their argument.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let selector = tokens.next()?;

        match selector {
            "bang" => Some(HostMessage::Bang),
            "reset" => Some(HostMessage::Reset),
            "load" => {
                // Paths may contain spaces, so take the rest of the line verbatim.
                let path = line[selector.len()..].trim();
                if path.is_empty() {
                    None
                } else {
                    Some(HostMessage::Load(PathBuf::from(path)))
                }
            }
            "bpm" => tokens.next()?.parse().ok().map(HostMessage::Bpm),
            "tpb" => tokens.next()?.parse().ok().map(HostMessage::Tpb),
            "list" => Some(HostMessage::List(tokens.map(Atom::parse).collect())),
            _ => Some(HostMessage::List(
                std::iter::once(selector).chain(tokens).map(Atom::parse).collect(),
            )),
        }
    }
}

/// A message produced by a script for the primary outlet.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundMessage {
    /// A note without duration: `note <note> <velocity> <channel>`.
    Note { note: i64, velocity: i64, channel: i64 },
    /// A note with duration: `makenote <note> <velocity> <ms> <channel>`.
    TimedNote {
        note: i64,
        velocity: i64,
        duration_ms: f64,
        channel: i64,
    },
    /// A controller change: `ctl <controller> <value> <channel>`.
    Control {
        controller: i64,
        value: i64,
        channel: i64,
    },
    /// An arbitrary list built by the script.
    Raw(Vec<Atom>),
}

impl OutboundMessage {
    /// Flatten into the atom list delivered on the primary outlet.
    pub fn to_atoms(&self) -> Vec<Atom> {
        match self {
            OutboundMessage::Note {
                note,
                velocity,
                channel,
            } => vec![
                Atom::symbol("note"),
                Atom::from(*note),
                Atom::from(*velocity),
                Atom::from(*channel),
            ],
            OutboundMessage::TimedNote {
                note,
                velocity,
                duration_ms,
                channel,
            } => vec![
                Atom::symbol("makenote"),
                Atom::from(*note),
                Atom::from(*velocity),
                Atom::Float(*duration_ms),
                Atom::from(*channel),
            ],
            OutboundMessage::Control {
                controller,
                value,
                channel,
            } => vec![
                Atom::symbol("ctl"),
                Atom::from(*controller),
                Atom::from(*value),
                Atom::from(*channel),
            ],
            OutboundMessage::Raw(atoms) => atoms.clone(),
        }
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_atoms(&self.to_atoms()))
    }
}

/// Status events for the secondary outlet.
#[derive(Clone, Debug, PartialEq)]
pub enum InfoEvent {
    /// A script was loaded and initialised.
    Loaded,
    /// The tick counter was reset.
    Reset,
    /// A tick or event handler failed.
    Error(String),
}

impl InfoEvent {
    pub fn to_atoms(&self) -> Vec<Atom> {
        match self {
            InfoEvent::Loaded => vec![Atom::symbol("loaded")],
            InfoEvent::Reset => vec![Atom::symbol("reset")],
            InfoEvent::Error(message) => vec![Atom::symbol("error"), Atom::symbol(message.clone())],
        }
    }
}

impl fmt::Display for InfoEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_atoms(&self.to_atoms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_parse() {
        assert_eq!(Atom::parse("60"), Atom::Float(60.0));
        assert_eq!(Atom::parse("-0.5"), Atom::Float(-0.5));
        assert_eq!(Atom::parse("note"), Atom::symbol("note"));
        assert_eq!(Atom::parse(";"), Atom::Semi);
        assert_eq!(Atom::parse(","), Atom::Comma);
        assert_eq!(Atom::parse("inf"), Atom::symbol("inf"));
    }

    #[test]
    fn test_atom_display() {
        assert_eq!(Atom::Float(60.0).to_string(), "60");
        assert_eq!(Atom::Float(0.25).to_string(), "0.25");
        assert_eq!(Atom::symbol("ctl").to_string(), "ctl");
    }

    #[test]
    fn test_parse_host_methods() {
        assert_eq!(HostMessage::parse("bang"), Some(HostMessage::Bang));
        assert_eq!(HostMessage::parse("  reset "), Some(HostMessage::Reset));
        assert_eq!(HostMessage::parse("bpm 120"), Some(HostMessage::Bpm(120.0)));
        assert_eq!(HostMessage::parse("tpb 96"), Some(HostMessage::Tpb(96.0)));
        assert_eq!(HostMessage::parse("bpm fast"), None);
        assert_eq!(HostMessage::parse("load"), None);
        assert_eq!(HostMessage::parse(""), None);
        assert_eq!(
            HostMessage::parse("load jams/my jam.rhai"),
            Some(HostMessage::Load(PathBuf::from("jams/my jam.rhai")))
        );
    }

    #[test]
    fn test_parse_lists() {
        let expected = HostMessage::List(vec![
            Atom::symbol("note"),
            Atom::Float(60.0),
            Atom::Float(100.0),
        ]);
        assert_eq!(HostMessage::parse("note 60 100"), Some(expected.clone()));
        assert_eq!(HostMessage::parse("list note 60 100"), Some(expected));
        assert_eq!(
            HostMessage::parse("list 1 2"),
            Some(HostMessage::List(vec![Atom::Float(1.0), Atom::Float(2.0)]))
        );
        // Only `bang` is a clock tick.
        assert_eq!(
            HostMessage::parse("tick 1"),
            Some(HostMessage::List(vec![Atom::symbol("tick"), Atom::Float(1.0)]))
        );
    }

    #[test]
    fn test_outbound_atoms() {
        let msg = OutboundMessage::TimedNote {
            note: 60,
            velocity: 100,
            duration_ms: 250.0,
            channel: 1,
        };
        assert_eq!(msg.to_string(), "makenote 60 100 250 1");

        let msg = OutboundMessage::Control {
            controller: 7,
            value: 64,
            channel: 2,
        };
        assert_eq!(msg.to_string(), "ctl 7 64 2");

        let msg = OutboundMessage::Note {
            note: 60,
            velocity: 0,
            channel: 1,
        };
        assert_eq!(msg.to_string(), "note 60 0 1");
    }

    #[test]
    fn test_info_atoms() {
        assert_eq!(InfoEvent::Loaded.to_string(), "loaded");
        assert_eq!(
            InfoEvent::Error("boom".to_string()).to_atoms(),
            vec![Atom::symbol("error"), Atom::symbol("boom")]
        );
    }
}

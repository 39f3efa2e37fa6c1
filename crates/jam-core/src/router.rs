//! Routing of tagged event lists to script handlers.
//!
//! An event list `note 60 100` routes to the command `note` with arguments
//! `60 100`. The script host then tries the handlers named by
//! [`handler_candidates`] in order: the specific `notein`, then the generic
//! `msgin`. A script may implement either style without the other.

use crate::message::Atom;

/// Suffix appended to a command name to form its specific handler name.
pub const HANDLER_SUFFIX: &str = "in";

/// Generic handler that receives any event without a specific handler.
pub const FALLBACK_HANDLER: &str = "msgin";

/// A routed event: the command tag and its remaining arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub command: String,
    pub args: Vec<Atom>,
}

/// Split an event list into command and arguments.
///
/// Empty lists and lists whose first atom is not a symbol are dropped.
pub fn route(atoms: &[Atom]) -> Option<Route> {
    let (tag, args) = atoms.split_first()?;
    let command = tag.as_symbol()?;
    Some(Route {
        command: command.to_string(),
        args: args.to_vec(),
    })
}

/// Handler names to try for `command`, most specific first.
pub fn handler_candidates(command: &str) -> [String; 2] {
    [
        format!("{}{}", command, HANDLER_SUFFIX),
        FALLBACK_HANDLER.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_strips_tag() {
        let atoms = vec![Atom::symbol("note"), Atom::Float(60.0), Atom::symbol("x")];
        let route = route(&atoms).unwrap();
        assert_eq!(route.command, "note");
        assert_eq!(route.args, vec![Atom::Float(60.0), Atom::symbol("x")]);
    }

    #[test]
    fn test_route_without_args() {
        let route = route(&[Atom::symbol("stop")]).unwrap();
        assert_eq!(route.command, "stop");
        assert!(route.args.is_empty());
    }

    #[test]
    fn test_non_symbol_tag_is_dropped() {
        assert_eq!(route(&[Atom::Float(1.0), Atom::symbol("note")]), None);
        assert_eq!(route(&[Atom::Semi]), None);
        assert_eq!(route(&[]), None);
    }

    #[test]
    fn test_handler_candidates() {
        assert_eq!(
            handler_candidates("note"),
            ["notein".to_string(), "msgin".to_string()]
        );
        assert_eq!(handler_candidates("ctl")[0], "ctlin");
    }
}

//! Conversions between host atoms and script values.

use crate::error::ScriptError;
use crate::message::Atom;
use rhai::{Dynamic, INT};

/// Placeholder emitted for script values that are neither numbers nor text.
pub const NIL_SYMBOL: &str = "nil";

/// Convert a host atom into a handler argument.
///
/// Integral numbers become integers so scripts can index arrays and compare
/// with integer literals. Separators have no script representation and yield
/// `None`.
pub fn atom_to_dynamic(atom: &Atom) -> Option<Dynamic> {
    match atom {
        Atom::Float(value) => Some(number_to_dynamic(*value)),
        Atom::Symbol(text) => Some(text.clone().into()),
        Atom::Semi | Atom::Comma => None,
    }
}

fn number_to_dynamic(value: f64) -> Dynamic {
    if value.fract() == 0.0 && value.abs() <= (1_i64 << 53) as f64 {
        Dynamic::from_int(value as INT)
    } else {
        Dynamic::from_float(value)
    }
}

/// Convert a script value into an outbound atom.
///
/// Numbers map to floats, strings and characters to symbols, everything else
/// to the [`NIL_SYMBOL`] placeholder.
pub fn dynamic_to_atom(value: &Dynamic) -> Atom {
    if let Some(number) = as_number(value) {
        return Atom::Float(number);
    }
    if value.is_string() {
        if let Ok(text) = value.clone().into_string() {
            return Atom::Symbol(text);
        }
    }
    if let Ok(c) = value.as_char() {
        return Atom::Symbol(c.to_string());
    }
    Atom::symbol(NIL_SYMBOL)
}

/// Read a script value as a number, if it is one.
pub fn as_number(value: &Dynamic) -> Option<f64> {
    if let Ok(i) = value.as_int() {
        return Some(i as f64);
    }
    value.as_float().ok()
}

/// Require an integer-like argument: an integer, or a float with an integral value.
pub fn check_integer(
    function: &'static str,
    position: usize,
    value: &Dynamic,
) -> Result<i64, ScriptError> {
    if let Ok(i) = value.as_int() {
        return Ok(i);
    }
    match value.as_float() {
        // i64::MAX as f64 rounds up to 2^63, which is already out of range.
        Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as i64)
        }
        Ok(_) => Err(ScriptError::CapabilityArgError {
            function,
            position,
            message: "number has no integer representation".to_string(),
        }),
        Err(found) => Err(ScriptError::CapabilityArgError {
            function,
            position,
            message: format!("number expected, got {}", found),
        }),
    }
}

/// Read an optional numeric argument: unit means "use the default".
pub fn opt_number(
    function: &'static str,
    position: usize,
    value: &Dynamic,
    default: f64,
) -> Result<f64, ScriptError> {
    if value.is_unit() {
        return Ok(default);
    }
    as_number(value).ok_or_else(|| ScriptError::CapabilityArgError {
        function,
        position,
        message: format!("number expected, got {}", value.type_name()),
    })
}

/// Loosely read a script-owned field as an integer.
///
/// Numbers are truncated, numeric strings are parsed, anything else reads as 0.
pub fn coerce_integer(value: &Dynamic) -> i64 {
    if let Some(number) = as_number(value) {
        return number as i64;
    }
    if let Ok(text) = value.clone().into_string() {
        if let Ok(number) = text.trim().parse::<f64>() {
            return number as i64;
        }
    }
    0
}

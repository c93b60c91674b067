//! Merge operators derived from `+` markers on key names
//!
//! | key      | existing value | effect                     |
//! |----------|----------------|----------------------------|
//! | `key`    | anything       | replace                    |
//! | `key+`   | mapping        | shallow update             |
//! | `key+`   | list / string  | append: existing + new     |
//! | `+key`   | mapping        | shallow update             |
//! | `+key`   | list / string  | prepend: new + existing    |
//! | `key+`   | number         | sum                        |
//!
//! A marked key with no existing value behaves like a plain key.
//! e3's `__update_state` reads the markers the other way round (`+key`
//! appends), so documents written for it swap their markers.

use crate::error::{Error, Result};
use crate::value::{Mapping, Value};

/// Position of the `+` marker on a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    /// `+key`
    Leading,
    /// `key+`
    Trailing,
}

/// A document key split into its canonical name and merge marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeKey<'a> {
    pub name: &'a str,
    pub marker: Marker,
}

impl<'a> MergeKey<'a> {
    /// Strip `+` markers from both ends of `raw` and classify them.
    /// A key marked on both ends counts as leading.
    pub fn parse(raw: &'a str) -> Self {
        let marker = if raw.starts_with('+') {
            Marker::Leading
        } else if raw.ends_with('+') {
            Marker::Trailing
        } else {
            Marker::None
        };
        Self {
            name: raw.trim_matches('+'),
            marker,
        }
    }
}

/// The operation [`apply`] performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOp {
    Set,
    Update,
    Append,
    Prepend,
}

impl MergeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            MergeOp::Set => "set",
            MergeOp::Update => "update",
            MergeOp::Append => "append",
            MergeOp::Prepend => "prepend",
        }
    }
}

/// Merge `value` into `target` under `key`.
///
/// `path` names the key for error messages.
pub fn apply(target: &mut Mapping, key: MergeKey<'_>, value: Value, path: &str) -> Result<MergeOp> {
    if key.marker == Marker::None || !target.contains_key(key.name) {
        target.insert(key.name.to_string(), value);
        return Ok(MergeOp::Set);
    }

    if let (Some(Value::Integer(a)), Value::Integer(b)) = (target.get(key.name), &value) {
        if a.checked_add(*b).is_none() {
            return Err(Error::merge_overflow(path, *a, *b));
        }
    }

    let existing = target
        .get_mut(key.name)
        .ok_or_else(|| Error::internal(format!("key {} vanished during merge", path)))?;
    let incoming_type = value.type_name();

    match (existing, key.marker) {
        (Value::Mapping(current), _) => match value {
            Value::Mapping(incoming) => {
                current.extend(incoming);
                Ok(MergeOp::Update)
            }
            _ => Err(Error::merge(path, "mapping", incoming_type)),
        },
        (existing, Marker::Trailing) => {
            *existing = existing
                .clone()
                .concat(value)
                .ok_or_else(|| Error::merge(path, existing.type_name(), incoming_type))?;
            Ok(MergeOp::Append)
        }
        (existing, _) => {
            *existing = value
                .concat(existing.clone())
                .ok_or_else(|| Error::merge(path, existing.type_name(), incoming_type))?;
            Ok(MergeOp::Prepend)
        }
    }
}

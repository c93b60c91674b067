//! `%(name)s` placeholder expansion
//!
//! Supported references:
//! - `%(name)s` / `%(name)r` - display form of the value
//! - `%(name)d` / `%(name)i` - integer (floats truncate, booleans are 0/1)
//! - `%(name)f` - float with six decimals
//! - `%%` - a literal percent sign
//!
//! A `%` that starts neither a reference nor `%%` is copied as-is, so
//! strings such as `"100%"` never need escaping.

use thiserror::Error;

use crate::value::{Mapping, Value};

/// Why a placeholder could not be expanded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("no value for placeholder '{0}'")]
    MissingKey(String),
    #[error("placeholder '{name}' expects {expected}, got {got}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
    #[error("unsupported conversion '{conversion}' for placeholder '{name}'")]
    UnsupportedConversion { name: String, conversion: char },
}

/// Expand every `%(name)<conv>` reference in `pattern` using `values`
pub fn format_with_dict(pattern: &str, values: &Mapping) -> Result<String, FormatError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('%') {
            out.push('%');
            rest = tail;
        } else if let Some(body) = after.strip_prefix('(') {
            let offset = pattern.len() - rest.len() + pos;
            let close = body.find(')').ok_or(FormatError::Unterminated(offset))?;
            let name = &body[..close];
            let mut tail = body[close + 1..].chars();
            let conversion = tail.next().ok_or(FormatError::Unterminated(offset))?;
            let value = values
                .get(name)
                .ok_or_else(|| FormatError::MissingKey(name.to_string()))?;
            out.push_str(&convert(name, conversion, value)?);
            rest = tail.as_str();
        } else {
            out.push('%');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn convert(name: &str, conversion: char, value: &Value) -> Result<String, FormatError> {
    let mismatch = |expected| FormatError::TypeMismatch {
        name: name.to_string(),
        expected,
        got: value.type_name(),
    };

    match conversion {
        's' | 'r' => Ok(value.to_string()),
        'd' | 'i' => match value {
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok((f.trunc() as i64).to_string()),
            Value::Bool(b) => Ok(i64::from(*b).to_string()),
            _ => Err(mismatch("a number")),
        },
        'f' => value
            .as_f64()
            .map(|f| format!("{:.6}", f))
            .ok_or_else(|| mismatch("a number")),
        other => Err(FormatError::UnsupportedConversion {
            name: name.to_string(),
            conversion: other,
        }),
    }
}

/// Expand placeholders in every string leaf of `value`.
///
/// Leaves that fail to expand are kept unchanged; the failure is only
/// logged. Mapping keys are never expanded.
pub fn format_value(value: &Value, values: &Mapping) -> Value {
    match value {
        Value::String(s) => match format_with_dict(s, values) {
            Ok(formatted) => Value::String(formatted),
            Err(e) => {
                log::debug!("Cannot format {:?}, ignore it: {}", s, e);
                value.clone()
            }
        },
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .map(|(k, v)| (k.clone(), format_value(v, values)))
                .collect(),
        ),
        Value::Sequence(seq) => {
            Value::Sequence(seq.iter().map(|v| format_value(v, values)).collect())
        }
        other => other.clone(),
    }
}

//! Regexp table lookup
//!
//! A table document maps each key to a list of rows. A row holds one
//! pattern per selector followed by the value:
//!
//! ```yaml
//! compiler:
//!   - ['x86_64-linux', 'debug', 'gcc -g']
//!   - ['.*-linux',     '',      'gcc']
//!   - ['',             '',      'cc']
//! ```
//!
//! For each key the value of the first row whose patterns all match the
//! selectors is kept; an empty pattern matches anything. Keys without a
//! matching row are left out.

use std::path::Path;

use crate::error::{Error, Result};
use crate::format::format_with_dict;
use crate::loader::load_ordered;
use crate::selector::PatternMatcher;
use crate::value::{Mapping, Value};

/// Load `path` and look up every key of the table with `selectors`
pub fn load_with_regexp_table(
    path: impl AsRef<Path>,
    selectors: &[String],
    data: &Mapping,
) -> Result<Mapping> {
    let path = path.as_ref();
    log::debug!("load {} with {:?}", path.display(), selectors);

    let document = load_ordered(path)?;
    regexp_table_lookup(&document, selectors, data).map_err(|e| e.in_file(path.display().to_string()))
}

/// Look up every key of an already loaded table document
pub fn regexp_table_lookup(
    document: &Value,
    selectors: &[String],
    data: &Mapping,
) -> Result<Mapping> {
    let Value::Mapping(table) = document else {
        return Err(Error::invalid_table(format!(
            "top level object should be a mapping, got {}",
            document.type_name()
        )));
    };

    let mut matcher = PatternMatcher::new();
    let mut result = Mapping::new();

    for (key, rows) in table {
        let Value::Sequence(rows) = rows else {
            return Err(Error::invalid_table(format!("value for key {} is not a list", key)));
        };

        for row in rows {
            let Value::Sequence(cells) = row else {
                return Err(Error::invalid_table(format!(
                    "value for key {} should be a list of lists",
                    key
                )));
            };
            let Some((value, patterns)) = cells.split_last() else {
                return Err(Error::invalid_table(format!("empty row for key {}", key)));
            };
            if patterns.len() != selectors.len() {
                return Err(Error::invalid_table(format!(
                    "rows for key {} need {} patterns, found {}",
                    key,
                    selectors.len(),
                    patterns.len()
                )));
            }

            if row_matches(&mut matcher, patterns, selectors)? {
                result.insert(key.clone(), value.clone());
                break;
            }
        }
    }

    for (key, value) in result.iter_mut() {
        *value = interpolate(key, value, data)?;
    }

    log::debug!("table results: {}", Value::Mapping(result.clone()));
    Ok(result)
}

fn row_matches(
    matcher: &mut PatternMatcher,
    patterns: &[Value],
    selectors: &[String],
) -> Result<bool> {
    for (pattern, selector) in patterns.iter().zip(selectors) {
        let pattern = pattern.to_string();
        let pattern = if pattern.is_empty() { ".*" } else { pattern.as_str() };
        if !matcher.is_match(pattern, selector)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Strings and string list items are formatted; failures are errors here
fn interpolate(key: &str, value: &Value, data: &Mapping) -> Result<Value> {
    let format = |s: &str| format_with_dict(s, data).map_err(|e| Error::format(key, e.to_string()));

    Ok(match value {
        Value::String(s) => Value::String(format(s)?),
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => format(s).map(Value::String),
                    other => Ok(other.clone()),
                })
                .collect::<Result<_>>()?,
        ),
        other => other.clone(),
    })
}

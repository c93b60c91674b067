//! Case statement branch selection
//!
//! A case statement `case_<variable>` maps regex patterns to sub-documents.
//! The value of `<variable>` in the state is stringified and matched against
//! each pattern in document order; the first full match wins.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{Error, Result};
use crate::value::{Mapping, Value};

/// Anchored regex matcher with a per-instance pattern cache
#[derive(Debug, Default)]
pub struct PatternMatcher {
    cache: HashMap<String, Regex>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `pattern` matches the whole of `text`
    pub fn is_match(&mut self, pattern: &str, text: &str) -> Result<bool> {
        if let Some(re) = self.cache.get(pattern) {
            return Ok(re.is_match(text));
        }
        let re = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
        let matched = re.is_match(text);
        self.cache.insert(pattern.to_string(), re);
        Ok(matched)
    }
}

/// Pick the branch of a case statement matching the current state.
///
/// `case_key` is the full key (used for error context), `variable` the part
/// after the case prefix. Returns `Ok(None)` when no pattern matches or the
/// matching branch is empty.
pub fn select_branch<'d>(
    matcher: &mut PatternMatcher,
    state: &Mapping,
    case_key: &str,
    variable: &str,
    branch: &'d Value,
    path: &str,
) -> Result<Option<&'d Value>> {
    let Value::Mapping(branches) = branch else {
        return Err(Error::invalid_case(case_key, path, branch.type_name()));
    };

    let selector = state
        .get(variable)
        .ok_or_else(|| Error::unknown_variable(variable, path))?
        .to_string();

    for (pattern, document) in branches {
        if matcher.is_match(pattern, &selector)? {
            log::debug!("{}={} match {}", variable, selector, pattern);
            if document.is_null() {
                return Ok(None);
            }
            return Ok(Some(document));
        }
    }

    log::debug!("{}={} matches no branch of {}", variable, selector, case_key);
    Ok(None)
}

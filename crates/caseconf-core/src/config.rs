//! Multi-document resolution
//!
//! Loads configuration files in order through a single [`CaseParser`], so
//! every document sees the keys set by the ones before it.

use std::path::Path;

use crate::error::Result;
use crate::loader::{load_ordered, load_str};
use crate::parser::{CaseParser, DEFAULT_CASE_PREFIX};
use crate::value::{Mapping, Value};

/// Options for loading configuration documents
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    /// Prefix marking case statements (default `case_`)
    pub case_prefix: String,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            case_prefix: DEFAULT_CASE_PREFIX.to_string(),
        }
    }
}

/// Load YAML files with case statement handling.
///
/// Files are resolved in order, each one updating the state left by the
/// previous one; the result of the last file is returned. `config` is the
/// initial state. An empty file list yields `Value::Null`.
///
/// # Examples
///
/// ```ignore
/// use caseconf_core::{load_with_config, Mapping, Value};
///
/// let mut initial = Mapping::new();
/// initial.insert("platform".into(), Value::from("x86_64-linux"));
/// let config = load_with_config(&["base.yaml", "local.yaml"], &initial)?;
/// ```
pub fn load_with_config<P: AsRef<Path>>(paths: &[P], config: &Mapping) -> Result<Value> {
    load_with_config_options(paths, config, &ConfigOptions::default())
}

/// Like [`load_with_config`], with explicit options
pub fn load_with_config_options<P: AsRef<Path>>(
    paths: &[P],
    config: &Mapping,
    options: &ConfigOptions,
) -> Result<Value> {
    let mut parser = CaseParser::with_prefix(config.clone(), options.case_prefix.as_str());
    let mut result = Value::Null;

    for path in paths {
        let path = path.as_ref();
        log::debug!("load config file: {}", path.display());

        let document = load_ordered(path)?;
        result = parser
            .parse(&document)
            .map_err(|e| e.in_file(path.display().to_string()))?;
    }

    Ok(result)
}

/// Resolve a single in-memory YAML document against `config`
pub fn resolve_str(yaml: &str, config: &Mapping) -> Result<Value> {
    let document = load_str(yaml)?;
    CaseParser::new(config.clone()).parse(&document)
}

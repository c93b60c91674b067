//! YAML document loading
//!
//! Turns YAML text into an ordered [`Value`] tree. Mapping order follows the
//! document, duplicate keys are rejected, and `!include path` splices in
//! another document relative to the including file.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result, SourceLocation};
use crate::value::{Mapping, Value};

const INCLUDE_TAG: &str = "!include";

/// Load a YAML file, keeping the file order
pub fn load_ordered(path: impl AsRef<Path>) -> Result<Value> {
    Loader::default().load_file(path.as_ref())
}

/// Load a YAML document from a string
///
/// `!include` paths are resolved against the current directory.
pub fn load_str(text: &str) -> Result<Value> {
    Loader::default().load_text(text, None)
}

/// Tracks the chain of files being loaded to detect include cycles
#[derive(Debug, Default)]
struct Loader {
    stack: Vec<PathBuf>,
}

impl Loader {
    fn load_file(&mut self, path: &Path) -> Result<Value> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.stack.contains(&key) {
            let mut chain: Vec<String> = self
                .stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(key.display().to_string());
            return Err(Error::circular_reference(chain).in_file(path.display().to_string()));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e.to_string()))?;

        self.stack.push(key);
        let result = self.load_text(&text, Some(path));
        self.stack.pop();
        result
    }

    fn load_text(&mut self, text: &str, origin: Option<&Path>) -> Result<Value> {
        let raw: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| syntax_error(&e, origin))?;
        let base_dir = origin.and_then(Path::parent);
        self.convert(raw, base_dir)
            .map_err(|e| match origin {
                Some(path) => e.in_file(path.display().to_string()),
                None => e,
            })
    }

    fn convert(&mut self, raw: serde_yaml::Value, base_dir: Option<&Path>) -> Result<Value> {
        use serde_yaml::Value as Yaml;

        Ok(match raw {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(b),
            Yaml::Number(n) => number(&n)?,
            Yaml::String(s) => Value::String(s),
            Yaml::Sequence(seq) => Value::Sequence(
                seq.into_iter()
                    .map(|item| self.convert(item, base_dir))
                    .collect::<Result<_>>()?,
            ),
            Yaml::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (k, v) in map {
                    let key = key_to_string(k)?;
                    let value = self.convert(v, base_dir)?;
                    if out.contains_key(&key) {
                        return Err(Error::parse(format!("found duplicate key ({})", key)));
                    }
                    out.insert(key, value);
                }
                Value::Mapping(out)
            }
            Yaml::Tagged(tagged) if tagged.tag == INCLUDE_TAG => {
                let Yaml::String(target) = tagged.value else {
                    return Err(Error::parse("!include expects a file path"));
                };
                let file = match base_dir {
                    Some(dir) => dir.join(&target),
                    None => PathBuf::from(&target),
                };
                log::debug!("include {}", file.display());
                self.load_file(&file)?
            }
            Yaml::Tagged(tagged) => {
                return Err(Error::parse(format!("unsupported tag {}", tagged.tag)));
            }
        })
    }
}

fn number(n: &serde_yaml::Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Integer(i));
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| Error::parse(format!("unrepresentable number {}", n)))
}

/// Mapping keys must be scalars; non-string scalars are stringified
fn key_to_string(key: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Sequence(_) => Err(Error::parse("found unacceptable key (sequence)")),
        Yaml::Mapping(_) => Err(Error::parse("found unacceptable key (mapping)")),
        Yaml::Tagged(t) => Err(Error::parse(format!("found unacceptable key ({})", t.tag))),
    }
}

fn syntax_error(err: &serde_yaml::Error, origin: Option<&Path>) -> Error {
    let file = origin
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<string>".to_string());
    let location = match err.location() {
        Some(loc) => SourceLocation {
            file,
            line: Some(loc.line()),
            column: Some(loc.column()),
        },
        None => SourceLocation::file(file),
    };
    Error::parse(err.to_string()).with_source_location(location)
}

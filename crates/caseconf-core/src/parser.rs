//! Case statement resolution
//!
//! [`CaseParser`] walks a document in order. Keys starting with the case
//! prefix (`case_` by default) select one of their branches from the current
//! state and the selected branch is resolved in place. Every other key is
//! resolved recursively, placeholder-expanded and merged into the state
//! according to its `+` markers.
//!
//! For instance, with an initial state `{param1: full, param2: short}`:
//!
//! ```yaml
//! case_param1:
//!   full:
//!     case_param2:
//!       full: {a: 2, b: 1, c: content}
//!       short: {y: 0, c: ''}
//!   short:
//!     case_param2:
//!       full: {a: 9, b: 5, c: default}
//!       short: {y: 3, c: ''}
//! value1: 10
//! value2: '%(c)s'
//! case_param2:
//!   'f.*l': {value3: 30, a: 42}
//! ```
//!
//! resolves to `{y: 0, c: '', value1: 10, value2: ''}`, and with
//! `{param1: short, param2: full}` to
//! `{a: 42, b: 5, c: default, value1: 10, value2: default, value3: 30}`.
//!
//! Keys of the initial state only appear in the result once a document
//! writes them.

use indexmap::IndexSet;

use crate::error::{Error, Result};
use crate::format::format_value;
use crate::merge::{self, MergeKey};
use crate::selector::{select_branch, PatternMatcher};
use crate::value::{Mapping, Value};

/// Prefix marking case statements unless configured otherwise
pub const DEFAULT_CASE_PREFIX: &str = "case_";

/// Deepest mapping nesting the parser will walk
pub const MAX_DEPTH: usize = 256;

/// Where the keys of the mapping being walked are written
#[derive(Debug)]
enum Cursor {
    /// The mapping inside the state at the current key path
    Live,
    /// A fresh mapping, merged into its parent once resolved
    Detached(Mapping),
}

/// Resolves case statements and merges documents into a persistent state
#[derive(Debug)]
pub struct CaseParser {
    state: Mapping,
    case_prefix: String,
    /// Top-level keys written so far; only these are returned by `parse`
    touched: IndexSet<String>,
    matcher: PatternMatcher,
}

impl CaseParser {
    /// Create a parser seeded with `initial` using the `case_` prefix
    pub fn new(initial: Mapping) -> Self {
        Self::with_prefix(initial, DEFAULT_CASE_PREFIX)
    }

    /// Create a parser with a custom case prefix
    pub fn with_prefix(initial: Mapping, case_prefix: impl Into<String>) -> Self {
        Self {
            state: initial,
            case_prefix: case_prefix.into(),
            touched: IndexSet::new(),
            matcher: PatternMatcher::new(),
        }
    }

    /// The current state, including untouched initial keys
    pub fn state(&self) -> &Mapping {
        &self.state
    }

    /// Top-level keys written by the documents parsed so far
    pub fn touched_keys(&self) -> impl Iterator<Item = &str> {
        self.touched.iter().map(String::as_str)
    }

    pub fn case_prefix(&self) -> &str {
        &self.case_prefix
    }

    /// Resolve `document` against the state.
    ///
    /// Returns the touched part of the state, or a bare value when the whole
    /// document resolves to a scalar or a sequence. The state keeps every
    /// change, so a later call sees the keys set by earlier documents.
    pub fn parse(&mut self, document: &Value) -> Result<Value> {
        let mut prefix = Vec::new();
        self.walk(document, &mut Cursor::Live, &mut prefix, 0)
    }

    fn walk(
        &mut self,
        data: &Value,
        cursor: &mut Cursor,
        prefix: &mut Vec<String>,
        depth: usize,
    ) -> Result<Value> {
        let Value::Mapping(map) = data else {
            return Ok(format_value(data, &self.state));
        };

        if depth > MAX_DEPTH {
            return Err(Error::internal(format!(
                "document nesting exceeds {} levels",
                MAX_DEPTH
            ))
            .with_path(key_path(prefix)));
        }

        for (key, node) in map {
            if let Some(variable) = key.strip_prefix(self.case_prefix.as_str()) {
                let path = key_path(prefix);
                let selected = select_branch(
                    &mut self.matcher,
                    &self.state,
                    key,
                    variable,
                    node,
                    &path,
                )?;
                let Some(branch) = selected else {
                    continue;
                };

                let result = self.walk(branch, cursor, prefix, depth + 1)?;
                if !result.is_mapping() {
                    if map.len() != 1 {
                        return Err(Error::case_not_sole(key, path));
                    }
                    return Ok(result);
                }
            } else {
                let merge_key = MergeKey::parse(key);
                let mut child = self.child_cursor(cursor, prefix, merge_key.name)?;

                prefix.push(merge_key.name.to_string());
                let resolved = self.walk(node, &mut child, prefix, depth + 1);
                let path = key_path(prefix);
                prefix.pop();

                self.update_state(merge_key, resolved?, cursor, prefix, &path)?;
            }
        }

        if prefix.is_empty() {
            let result: Mapping = self
                .state
                .iter()
                .filter(|(k, _)| self.touched.contains(k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            return Ok(Value::Mapping(result));
        }

        match cursor {
            Cursor::Live => Ok(Value::Mapping(self.live_mapping(prefix)?.clone())),
            Cursor::Detached(m) => Ok(Value::Mapping(m.clone())),
        }
    }

    /// Cursor for the value of `name` below the current cursor
    fn child_cursor(&self, cursor: &Cursor, prefix: &[String], name: &str) -> Result<Cursor> {
        let existing = match cursor {
            Cursor::Live => self.live_mapping(prefix)?.get(name),
            Cursor::Detached(m) => m.get(name),
        };

        Ok(match (cursor, existing) {
            (Cursor::Live, Some(Value::Mapping(_))) => Cursor::Live,
            (Cursor::Detached(_), Some(Value::Mapping(m))) => Cursor::Detached(m.clone()),
            _ => Cursor::Detached(Mapping::new()),
        })
    }

    fn update_state(
        &mut self,
        key: MergeKey<'_>,
        value: Value,
        cursor: &mut Cursor,
        prefix: &[String],
        path: &str,
    ) -> Result<()> {
        let value = format_value(&value, &self.state);

        if prefix.is_empty() {
            self.touched.insert(key.name.to_string());
        }

        let target = match cursor {
            Cursor::Live => self.live_mapping_mut(prefix)?,
            Cursor::Detached(m) => m,
        };
        let op = merge::apply(target, key, value, path)?;

        if let Some(merged) = target.get(key.name) {
            log::debug!("{} {} -> {}", op.as_str(), path, merged);
        }
        Ok(())
    }

    fn live_mapping(&self, prefix: &[String]) -> Result<&Mapping> {
        let mut current = &self.state;
        for name in prefix {
            current = current
                .get(name)
                .and_then(Value::as_mapping)
                .ok_or_else(|| lost_cursor(prefix))?;
        }
        Ok(current)
    }

    fn live_mapping_mut(&mut self, prefix: &[String]) -> Result<&mut Mapping> {
        let mut current = &mut self.state;
        for name in prefix {
            current = current
                .get_mut(name)
                .and_then(Value::as_mapping_mut)
                .ok_or_else(|| lost_cursor(prefix))?;
        }
        Ok(current)
    }
}

fn lost_cursor(prefix: &[String]) -> Error {
    Error::internal("state no longer holds a mapping at the cursor").with_path(key_path(prefix))
}

/// `["a", "b"]` -> `[a][b]`
fn key_path(prefix: &[String]) -> String {
    prefix.iter().map(|p| format!("[{}]", p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::loader::load_str;
    use pretty_assertions::assert_eq;

    fn seed(entries: &[(&str, Value)]) -> Mapping {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn keys(value: &Value) -> Vec<&str> {
        value
            .as_mapping()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect()
    }

    const NESTED_CASES: &str = r#"
case_param1:
  full:
    case_param2:
      full: {a: 2, b: 1, c: content}
      short: {y: 0, c: ''}
  short:
    case_param2:
      full: {a: 9, b: 5, c: default}
      short: {y: 3, c: ''}
value1: 10
value2: '%(c)s'
case_param2:
  'f.*l': {value3: 30, a: 42}
"#;

    #[test]
    fn test_nested_cases_full_short() {
        let mut parser = CaseParser::new(seed(&[
            ("param1", Value::from("full")),
            ("param2", Value::from("short")),
        ]));
        let result = parser.parse(&load_str(NESTED_CASES).unwrap()).unwrap();

        let expected = Value::from_iter([
            ("y", Value::from(0)),
            ("c", Value::from("")),
            ("value1", Value::from(10)),
            ("value2", Value::from("")),
        ]);
        assert_eq!(result, expected);
        assert_eq!(keys(&result), vec!["y", "c", "value1", "value2"]);
    }

    #[test]
    fn test_nested_cases_short_full() {
        let mut parser = CaseParser::new(seed(&[
            ("param1", Value::from("short")),
            ("param2", Value::from("full")),
        ]));
        let result = parser.parse(&load_str(NESTED_CASES).unwrap()).unwrap();

        let expected = Value::from_iter([
            ("a", Value::from(42)),
            ("b", Value::from(5)),
            ("c", Value::from("default")),
            ("value1", Value::from(10)),
            ("value2", Value::from("default")),
            ("value3", Value::from(30)),
        ]);
        assert_eq!(result, expected);
        assert_eq!(
            keys(&result),
            vec!["a", "b", "c", "value1", "value2", "value3"]
        );
    }

    #[test]
    fn test_nested_case_only_document() {
        let doc = load_str(
            r#"
case_param1:
  full:
    case_param2:
      full: {a: 2, b: 1, c: "x"}
      short: {y: 0, c: ""}
  short:
    case_param2:
      full: {a: 9}
      short: {y: 3}
"#,
        )
        .unwrap();
        let mut parser = CaseParser::new(seed(&[
            ("param1", Value::from("full")),
            ("param2", Value::from("short")),
        ]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(
            result,
            Value::from_iter([("y", Value::from(0)), ("c", Value::from(""))])
        );
    }

    #[test]
    fn test_no_cases_is_plain_formatting() {
        let doc = load_str(
            r#"
name: "%(target)s-tool"
dirs: ["/opt/%(target)s", "/usr"]
nested:
  path: "%(target)s/lib"
  count: 3
"#,
        )
        .unwrap();
        let mut parser = CaseParser::new(seed(&[("target", Value::from("arm"))]));
        let result = parser.parse(&doc).unwrap();

        let expected = load_str(
            r#"
name: "arm-tool"
dirs: ["/opt/arm", "/usr"]
nested:
  path: "arm/lib"
  count: 3
"#,
        )
        .unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_unmatched_case_contributes_nothing() {
        let doc = load_str("case_os:\n  linux: {kind: unix}\nname: app\n").unwrap();
        let mut parser = CaseParser::new(seed(&[("os", Value::from("windows"))]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(result, Value::from_iter([("name", "app")]));
    }

    #[test]
    fn test_untouched_seed_keys_are_dropped() {
        let doc = load_str("os: freebsd\nname: app\n").unwrap();
        let mut parser = CaseParser::new(seed(&[
            ("os", Value::from("linux")),
            ("arch", Value::from("x86")),
        ]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(
            result,
            Value::from_iter([("os", "freebsd"), ("name", "app")])
        );
        assert_eq!(parser.state()["arch"], Value::from("x86"));
    }

    #[test]
    fn test_later_keys_see_earlier_writes() {
        let doc = load_str(
            r#"
mode: release
case_mode:
  debug: {opt: "-O0"}
  release: {opt: "-O2"}
prefix: /opt
bindir: "%(prefix)s/bin"
"#,
        )
        .unwrap();
        let mut parser = CaseParser::new(seed(&[("mode", Value::from("debug"))]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(result.get_path("opt").unwrap().as_str(), Some("-O2"));
        assert_eq!(result.get_path("bindir").unwrap().as_str(), Some("/opt/bin"));
    }

    #[test]
    fn test_append_and_prepend_markers() {
        let mut parser = CaseParser::new(seed(&[("list", Value::from(vec![1, 2]))]));
        let result = parser.parse(&load_str("list+: [3]\n").unwrap()).unwrap();
        assert_eq!(result, Value::from_iter([("list", vec![1, 2, 3])]));

        let mut parser = CaseParser::new(seed(&[("list", Value::from(vec![1, 2]))]));
        let result = parser.parse(&load_str("+list: [3]\n").unwrap()).unwrap();
        assert_eq!(result, Value::from_iter([("list", vec![3, 1, 2])]));
    }

    #[test]
    fn test_whole_float_keeps_its_fraction() {
        let doc = load_str(
            r#"
case_version:
  '1\.0': {a: 1}
  '1': {a: 2}
v: '%(version)s'
"#,
        )
        .unwrap();
        let mut parser = CaseParser::new(seed(&[("version", Value::Float(1.0))]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(
            result,
            Value::from_iter([("a", Value::from(1)), ("v", Value::from("1.0"))])
        );
    }

    #[test]
    fn test_marked_numbers_add() {
        let mut parser = CaseParser::new(seed(&[("n", Value::from(2))]));
        let result = parser.parse(&load_str("n+: 1
").unwrap()).unwrap();
        assert_eq!(result, Value::from_iter([("n", 3)]));

        let mut parser = CaseParser::new(seed(&[("n", Value::from(2))]));
        let result = parser.parse(&load_str("+n: 0.5
").unwrap()).unwrap();
        assert_eq!(result, Value::from_iter([("n", 2.5)]));
    }

    #[test]
    fn test_append_within_one_document() {
        let doc = load_str(
            r#"
flags: ["-Wall"]
case_mode:
  debug:
    flags+: ["-g"]
"+flags": ["-pipe"]
"#,
        )
        .unwrap();
        let mut parser = CaseParser::new(seed(&[("mode", Value::from("debug"))]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(
            result.get_path("flags").unwrap(),
            &Value::from(vec!["-pipe", "-Wall", "-g"])
        );
    }

    #[test]
    fn test_plain_key_updates_existing_mapping() {
        let mut parser = CaseParser::new(seed(&[("opts", Value::from_iter([("a", 1)]))]));
        let result = parser.parse(&load_str("opts: {b: 2}\n").unwrap()).unwrap();

        assert_eq!(
            result,
            Value::from_iter([("opts", Value::from_iter([("a", 1), ("b", 2)]))])
        );
    }

    #[test]
    fn test_nested_case_inside_key() {
        let doc = load_str(
            r#"
build:
  name: app
  case_mode:
    debug: {flags: ["-g"]}
    release: {flags: ["-O2"]}
"#,
        )
        .unwrap();
        let mut parser = CaseParser::new(seed(&[("mode", Value::from("debug"))]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(
            result.get_path("build").unwrap(),
            &Value::from_iter([
                ("name", Value::from("app")),
                ("flags", Value::from(vec!["-g"])),
            ])
        );
    }

    #[test]
    fn test_sole_case_resolving_to_scalar() {
        let doc = load_str(
            r#"
cflags:
  case_mode:
    debug: "-g"
    release: "-O2"
"#,
        )
        .unwrap();
        let mut parser = CaseParser::new(seed(&[("mode", Value::from("release"))]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(result, Value::from_iter([("cflags", "-O2")]));
    }

    #[test]
    fn test_whole_document_resolving_to_scalar() {
        let doc = load_str("case_mode:\n  debug: 'dbg-%(mode)s'\n").unwrap();
        let mut parser = CaseParser::new(seed(&[("mode", Value::from("debug"))]));

        assert_eq!(parser.parse(&doc).unwrap(), Value::from("dbg-debug"));
    }

    #[test]
    fn test_case_with_siblings_resolving_to_scalar_fails() {
        let doc = load_str(
            r#"
cflags:
  case_mode:
    debug: "-g"
  extra: 1
"#,
        )
        .unwrap();
        let mut parser = CaseParser::new(seed(&[("mode", Value::from("debug"))]));
        let err = parser.parse(&doc).unwrap_err();

        assert_eq!(
            err.kind,
            ErrorKind::CaseNotSole {
                key: "case_mode".into()
            }
        );
        assert_eq!(err.path.as_deref(), Some("[cflags]"));
    }

    #[test]
    fn test_unknown_selector_variable_fails() {
        let doc = load_str("case_os:\n  linux: {a: 1}\n").unwrap();
        let mut parser = CaseParser::new(Mapping::new());
        let err = parser.parse(&doc).unwrap_err();

        assert_eq!(err.kind, ErrorKind::UnknownVariable { name: "os".into() });
    }

    #[test]
    fn test_missing_placeholder_is_kept() {
        let doc = load_str("path: '%(missing)s/bin'\nname: '%(name)s'\n").unwrap();
        let mut parser = CaseParser::new(seed(&[("name", Value::from("app"))]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(
            result,
            Value::from_iter([("path", "%(missing)s/bin"), ("name", "app")])
        );
    }

    #[test]
    fn test_state_persists_across_documents() {
        let mut parser = CaseParser::new(seed(&[("host", Value::from("linux"))]));
        parser
            .parse(&load_str("target: arm-elf\n").unwrap())
            .unwrap();
        let result = parser
            .parse(&load_str("case_target:\n  arm-.*: {abi: eabi}\n").unwrap())
            .unwrap();

        assert_eq!(
            result,
            Value::from_iter([("target", "arm-elf"), ("abi", "eabi")])
        );
        assert_eq!(parser.touched_keys().collect::<Vec<_>>(), vec!["target", "abi"]);
    }

    #[test]
    fn test_custom_prefix() {
        let doc = load_str("when_os:\n  linux: {a: 1}\ncase_os: literal\n").unwrap();
        let mut parser = CaseParser::with_prefix(seed(&[("os", Value::from("linux"))]), "when_");
        let result = parser.parse(&doc).unwrap();

        assert_eq!(parser.case_prefix(), "when_");
        assert_eq!(
            result,
            Value::from_iter([("a", Value::from(1)), ("case_os", Value::from("literal"))])
        );
    }

    #[test]
    fn test_detached_subtree_is_merged() {
        let doc = load_str("outer:\n  inner:\n    leaf: '%(v)s'\n").unwrap();
        let mut parser = CaseParser::new(seed(&[("v", Value::from("x"))]));
        let result = parser.parse(&doc).unwrap();

        assert_eq!(result.get_path("outer.inner.leaf").unwrap().as_str(), Some("x"));
        assert_eq!(
            parser.state()["outer"],
            Value::from_iter([("inner", Value::from_iter([("leaf", "x")]))])
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut doc = Value::from(1);
        for _ in 0..(MAX_DEPTH + 2) {
            doc = Value::from_iter([("k", doc)]);
        }
        let mut parser = CaseParser::new(Mapping::new());
        let err = parser.parse(&doc).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_key_path() {
        assert_eq!(key_path(&[]), "");
        assert_eq!(key_path(&["a".into(), "b".into()]), "[a][b]");
    }
}

//! caseconf-core: conditional configuration resolution
//!
//! Configuration documents contain `case_<variable>` statements whose keys are
//! regular expressions matched against runtime parameters. Resolution picks
//! the matching branches, merges keys according to `+` markers and expands
//! `%(name)s` placeholders against the accumulated state.
//!
//! # Example
//!
//! ```rust
//! use caseconf_core::{resolve_str, Mapping, Value};
//!
//! let yaml = r#"
//! case_mode:
//!   debug: {cflags: ["-g"]}
//!   release: {cflags: ["-O2"]}
//! cflags+: ["-Wall"]
//! output: "build/%(mode)s"
//! "#;
//!
//! let mut initial = Mapping::new();
//! initial.insert("mode".into(), Value::from("release"));
//!
//! let config = resolve_str(yaml, &initial).unwrap();
//! assert_eq!(config.get_path("cflags[1]").unwrap().as_str(), Some("-Wall"));
//! assert_eq!(config.get_path("output").unwrap().as_str(), Some("build/release"));
//! ```

pub mod error;
pub mod format;
pub mod loader;
pub mod merge;
pub mod parser;
pub mod selector;
pub mod table;
pub mod value;

mod config;

pub use config::{load_with_config, load_with_config_options, resolve_str, ConfigOptions};
pub use error::{Error, ErrorKind, Result};
pub use loader::{load_ordered, load_str};
pub use parser::CaseParser;
pub use table::{load_with_regexp_table, regexp_table_lookup};
pub use value::{Mapping, Value};

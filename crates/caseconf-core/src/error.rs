//! Error types for caseconf
//!
//! Structured errors with context: the key path inside the document,
//! the source file being resolved, and an actionable help message.
//!
//! Placeholder formatting failures are not represented here; they use
//! [`crate::format::FormatError`] and are swallowed by the engine.

use std::fmt;

/// Result type alias for caseconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for caseconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Key path in the document where the error occurred (e.g., "[build][flags]")
    pub path: Option<String>,
    /// Source document, if the error happened while loading or resolving a file
    pub source_location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl SourceLocation {
    /// Location naming a whole file
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid document syntax, duplicate or unacceptable keys
    Parse,
    /// The source could not be read
    Io,
    /// A case statement refers to a variable missing from the state
    UnknownVariable { name: String },
    /// A case statement resolved to a non-mapping but has sibling keys
    CaseNotSole { key: String },
    /// A case statement whose value is not a mapping of patterns
    InvalidCase { key: String },
    /// A case pattern or table pattern that is not a valid regex
    InvalidPattern { pattern: String },
    /// Append/prepend/update between values that cannot be combined
    Merge { key: String },
    /// `!include` chain that includes itself
    CircularReference,
    /// Regexp table document with the wrong shape
    InvalidTable,
    /// Strict placeholder formatting failed
    Format,
    /// Internal error (bug in caseconf)
    Internal,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            source_location: None,
            help: None,
            cause: None,
        }
    }

    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Parse)
        }
    }

    /// Create an I/O error for a source that cannot be read
    pub fn io(file: impl Into<String>, message: impl Into<String>) -> Self {
        let file = file.into();
        Self {
            help: Some(format!("Check that '{}' exists and is readable", file)),
            cause: Some(message.into()),
            source_location: Some(SourceLocation::file(file)),
            ..Self::new(ErrorKind::Io)
        }
    }

    /// Create an unknown selector variable error
    pub fn unknown_variable(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: non_empty(path.into()),
            help: Some(format!(
                "Add '{}' to the initial configuration or set it in an earlier document",
                name
            )),
            ..Self::new(ErrorKind::UnknownVariable { name })
        }
    }

    /// Create a "case statement is not the sole key" error
    pub fn case_not_sole(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: non_empty(path.into()),
            help: Some(
                "A case statement that resolves to a scalar or a list must be the only key of its mapping"
                    .into(),
            ),
            ..Self::new(ErrorKind::CaseNotSole { key: key.into() })
        }
    }

    /// Create an invalid case statement error
    pub fn invalid_case(key: impl Into<String>, path: impl Into<String>, got: &str) -> Self {
        Self {
            path: non_empty(path.into()),
            help: Some("The value of a case statement must map patterns to documents".into()),
            cause: Some(format!("Got: {}", got)),
            ..Self::new(ErrorKind::InvalidCase { key: key.into() })
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            ..Self::new(ErrorKind::InvalidPattern {
                pattern: pattern.into(),
            })
        }
    }

    /// Create a merge error for operands that cannot be combined
    pub fn merge(key: impl Into<String>, existing: &str, incoming: &str) -> Self {
        let key = key.into();
        Self {
            path: Some(key.clone()),
            help: Some(
                "'+' markers concatenate lists or strings and add numbers; use a plain key to replace the value"
                    .into(),
            ),
            cause: Some(format!("Cannot combine {} with {}", existing, incoming)),
            ..Self::new(ErrorKind::Merge { key })
        }
    }

    /// Create an error for an integer `+` merge whose sum does not fit in an i64
    pub fn merge_overflow(key: impl Into<String>, existing: i64, incoming: i64) -> Self {
        let key = key.into();
        Self {
            path: Some(key.clone()),
            cause: Some(format!("{} + {} overflows a 64-bit integer", existing, incoming)),
            ..Self::new(ErrorKind::Merge { key })
        }
    }

    /// Create a circular include error
    pub fn circular_reference(chain: Vec<String>) -> Self {
        Self {
            help: Some("Break the cycle by removing one of the !include directives".into()),
            cause: Some(format!("Chain: {}", chain.join(" → "))),
            ..Self::new(ErrorKind::CircularReference)
        }
    }

    /// Create an invalid regexp table error
    pub fn invalid_table(message: impl Into<String>) -> Self {
        Self {
            help: Some("Each key must map to a list of [pattern_1, ..., pattern_n, value] rows".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::InvalidTable)
        }
    }

    /// Create a strict formatting error
    pub fn format(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: non_empty(path.into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Format)
        }
    }

    /// Create an internal error (bug in caseconf)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            help: Some("This is likely a bug in caseconf. Please report it.".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Internal)
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add source location to the error
    pub fn with_source_location(mut self, loc: SourceLocation) -> Self {
        self.source_location = Some(loc);
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach the source file unless a more precise location is already known
    pub fn in_file(self, file: impl Into<String>) -> Self {
        if self.source_location.is_some() {
            self
        } else {
            self.with_source_location(SourceLocation::file(file))
        }
    }
}

fn non_empty(path: String) -> Option<String> {
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse => write!(f, "Invalid document")?,
            ErrorKind::Io => write!(f, "Cannot read source")?,
            ErrorKind::UnknownVariable { name } => {
                write!(f, "Unknown case variable: {}", name)?
            }
            ErrorKind::CaseNotSole { key } => {
                write!(f, "Case statement '{}' is not the sole key at its level", key)?
            }
            ErrorKind::InvalidCase { key } => write!(f, "Invalid case statement: {}", key)?,
            ErrorKind::InvalidPattern { pattern } => {
                write!(f, "Invalid pattern: {}", pattern)?
            }
            ErrorKind::Merge { key } => write!(f, "Cannot merge key: {}", key)?,
            ErrorKind::CircularReference => write!(f, "Circular include detected")?,
            ErrorKind::InvalidTable => write!(f, "Invalid regexp table")?,
            ErrorKind::Format => write!(f, "Formatting failed")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(loc) = &self.source_location {
            write!(f, "\n  File: {}", loc.file)?;
            if let Some(line) = loc.line {
                write!(f, ":{}", line)?;
                if let Some(column) = loc.column {
                    write!(f, ":{}", column)?;
                }
            }
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

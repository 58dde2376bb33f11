use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::ast::Position;

/// Template file and line a diagnostic points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: Option<u32>,
}

impl Location {
    /// Resolve a node position, falling back to the template being compiled
    /// when the parser didn't record a file.
    pub fn of(pos: &Position, current_file: &str) -> Self {
        Self {
            file: pos.file.clone().unwrap_or_else(|| current_file.to_string()),
            line: pos.line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} on line {}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Corrupted statement in {location}: missing '{field}'")]
    CorruptStatement {
        field: &'static str,
        location: Location,
    },

    #[error("Unknown statement in {location}")]
    UnknownStatement { location: Location },

    #[error("Unknown expression in {location}")]
    UnknownExpression { location: Location },

    #[error("Unknown filter \"{name}\" in {location}")]
    UnknownFilter { name: String, location: Location },

    #[error("Unknown filter type in {location}")]
    InvalidFilter { location: Location },

    #[error("Macro '{name}' is already defined in {location}")]
    DuplicateMacro { name: String, location: Location },

    #[error("'{option}' must be {expected}")]
    InvalidOption {
        option: String,
        expected: &'static str,
    },

    #[error("'path' resolver didn't return a valid string for {template}")]
    PathResolution { template: String },

    #[error("The unique compilation prefix is invalid")]
    InvalidPrefix,

    #[error("Template file {} does not exist", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Template file {} could not be opened", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Template path and compilation path can't be the same: {}", path.display())]
    SamePath { path: PathBuf },

    #[error("Compiled template {} could not be read", path.display())]
    CacheRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Extends compilation file {} is corrupted", path.display())]
    InvalidCache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Compiled template {} could not be written", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid intermediate representation in {source_id}: {reason}")]
    InvalidIr { source_id: String, reason: String },
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_includes_line_when_known() {
        let loc = Location {
            file: "views/index.volt".into(),
            line: Some(12),
        };
        assert_eq!(loc.to_string(), "views/index.volt on line 12");

        let loc = Location {
            file: "eval code".into(),
            line: None,
        };
        assert_eq!(loc.to_string(), "eval code");
    }

    #[test]
    fn location_falls_back_to_current_file() {
        let pos = Position {
            file: None,
            line: Some(3),
        };
        let loc = Location::of(&pos, "layout.volt");
        assert_eq!(loc.file, "layout.volt");
        assert_eq!(loc.line, Some(3));
    }

    #[test]
    fn filter_error_message_names_filter_and_location() {
        let err = CompileError::UnknownFilter {
            name: "shout".into(),
            location: Location {
                file: "a.volt".into(),
                line: Some(2),
            },
        };
        assert_eq!(err.to_string(), "Unknown filter \"shout\" in a.volt on line 2");
    }
}

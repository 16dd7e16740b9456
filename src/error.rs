//! Error types for profile parsing
//!
//! Every parse-time failure aborts the whole-file parse and surfaces as a
//! single `ProfileError`. Rows committed to the in-memory maps before the
//! failing line are not rolled back; the caller decides whether to treat the
//! profile as absent.

use std::path::PathBuf;
use thiserror::Error;

/// Errors for profile file parsing
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("failed to open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read profile line: {0}")]
    Read(#[from] std::io::Error),

    #[error("{0}")]
    Schema(String),

    #[error("cannot parse {cell:?} as {expected}")]
    NumericParse { cell: String, expected: &'static str },

    /// Wraps an inner error with the file and line it came from.
    #[error("{path}:{line}: {source}")]
    AtLine {
        path: String,
        line: usize,
        #[source]
        source: Box<ProfileError>,
    },
}

pub type Result<T> = std::result::Result<T, ProfileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_displays_message() {
        let err = ProfileError::Schema("unexpected header".to_string());
        assert_eq!(err.to_string(), "unexpected header");
    }

    #[test]
    fn test_numeric_error_names_cell_and_type() {
        let err = ProfileError::NumericParse {
            cell: "12x".to_string(),
            expected: "u32",
        };
        assert_eq!(err.to_string(), "cannot parse \"12x\" as u32");
    }

    #[test]
    fn test_at_line_wraps_inner_error() {
        let inner = ProfileError::Schema("bad column".to_string());
        let err = ProfileError::AtLine {
            path: "stats.csv".to_string(),
            line: 7,
            source: Box::new(inner),
        };
        assert_eq!(err.to_string(), "stats.csv:7: bad column");
    }
}

//! Error types for handler block extraction.
//!
//! This module defines the marker-format diagnostics produced while pulling
//! embedded `> {% ... %}` script blocks out of request-definition text.

use std::fmt;

/// Errors that can occur while extracting handler blocks.
///
/// Each variant carries the line number needed to locate the problem in the
/// source file. A diagnostic is terminal for its request definition but
/// never aborts extraction for sibling definitions in the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerParseError {
    /// The closing `%}` delimiter was never found before end of input.
    MissingClosingMarker {
        /// Line number where the unterminated block starts (1-based)
        line: usize,
    },

    /// A line contains the closing delimiter's characters with whitespace
    /// inserted between them (e.g. `% }`), a visually similar but invalid
    /// pattern. Reported distinctly from a missing marker.
    MalformedClosingMarker {
        /// Line number of the malformed marker (1-based)
        line: usize,
    },

    /// The first closing delimiter appears at or before the opening
    /// delimiter in the accumulated block text.
    MarkersOutOfOrder {
        /// Line number where the block starts (1-based)
        line: usize,
    },
}

impl HandlerParseError {
    /// Returns the line number associated with this diagnostic.
    pub fn line(&self) -> usize {
        match self {
            HandlerParseError::MissingClosingMarker { line } => *line,
            HandlerParseError::MalformedClosingMarker { line } => *line,
            HandlerParseError::MarkersOutOfOrder { line } => *line,
        }
    }
}

impl fmt::Display for HandlerParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerParseError::MissingClosingMarker { line } => {
                write!(
                    f,
                    "missing closing marker: handler block starting at line {} is never closed with '%}}'",
                    line
                )
            }
            HandlerParseError::MalformedClosingMarker { line } => {
                write!(
                    f,
                    "malformed closing marker at line {}: found '%' and '}}' separated by whitespace, expected '%}}'",
                    line
                )
            }
            HandlerParseError::MarkersOutOfOrder { line } => {
                write!(
                    f,
                    "markers out of order in handler block starting at line {}: '%}}' appears before '{{%'",
                    line
                )
            }
        }
    }
}

impl std::error::Error for HandlerParseError {}

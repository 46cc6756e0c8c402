//! Failure taxonomy and outcome types for handler script execution.
//!
//! Every failure carries a machine-distinguishable kind plus a
//! human-readable message so callers can branch (retry, surface, log)
//! without string matching. No failure here ever propagates as a panic.

use std::fmt;

/// Canonical message for a timed-out execution, replacing whatever wording
/// the underlying engine uses for an interrupt.
pub const TIMEOUT_MESSAGE: &str = "timeout";

/// Canonical phrase covering the engine's distinct "ran off the end of the
/// source" syntax variants (missing close paren, brace, or bracket).
pub const UNEXPECTED_END_MESSAGE: &str = "unexpected end of input";

/// Category of a failed handler execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptErrorKind {
    /// The script could not be parsed at all.
    Syntax,

    /// The script threw or errored while running, including body-parse
    /// failures raised through the capability API.
    Runtime,

    /// The script exceeded the wall-clock execution deadline.
    Timeout,

    /// A persistent variable write was rejected by the durable-write
    /// collaborator.
    Persistence,
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptErrorKind::Syntax => write!(f, "syntax"),
            ScriptErrorKind::Runtime => write!(f, "runtime"),
            ScriptErrorKind::Timeout => write!(f, "timeout"),
            ScriptErrorKind::Persistence => write!(f, "persistence"),
        }
    }
}

/// A failed handler execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// Failure category for programmatic branching.
    pub kind: ScriptErrorKind,

    /// Human-readable message, passed through from the engine except for
    /// the normalizations described on [`normalize_error_message`].
    pub message: String,
}

impl ScriptError {
    /// Creates an error of the given kind, normalizing the message.
    pub fn new(kind: ScriptErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: normalize_error_message(&message.into()),
        }
    }

    /// Creates the canonical timeout error.
    pub fn timeout() -> Self {
        Self {
            kind: ScriptErrorKind::Timeout,
            message: TIMEOUT_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Result of one `client.assert(name, predicate)` call.
///
/// Asserts record pass/fail without aborting the remaining script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertRecord {
    /// Label supplied by the script.
    pub name: String,

    /// Whether the predicate returned a truthy value.
    pub passed: bool,

    /// Error message if the predicate itself threw.
    pub message: Option<String>,
}

/// Outcome of one handler execution.
///
/// Variable writes are side effects committed to the store during
/// execution; they are observable afterward and are deliberately not part
/// of this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// The failure, if any. `None` means the script ran to completion and
    /// every persistent write was accepted.
    pub error: Option<ScriptError>,

    /// Assert results recorded by the script, in call order.
    pub asserts: Vec<AssertRecord>,
}

impl ExecutionOutcome {
    /// A successful outcome with no asserts.
    pub fn success() -> Self {
        Self {
            error: None,
            asserts: Vec::new(),
        }
    }

    /// A failed outcome with no asserts.
    pub fn failure(error: ScriptError) -> Self {
        Self {
            error: Some(error),
            asserts: Vec::new(),
        }
    }

    /// Whether the execution completed without any failure.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// The failure kind, if the execution failed.
    pub fn error_kind(&self) -> Option<ScriptErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Normalizes engine error text for stable caller-visible behavior.
///
/// The embedded engine reports a missing close paren, brace, or bracket
/// with distinct "unexpected end" wordings; all of them collapse to the
/// canonical [`UNEXPECTED_END_MESSAGE`]. Every other message passes
/// through unchanged.
pub fn normalize_error_message(message: &str) -> String {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("unexpected end of")
        || (lowered.contains("expecting") && ["')'", "'}'", "']'"].iter().any(|t| lowered.contains(t)))
    {
        return UNEXPECTED_END_MESSAGE.to_string();
    }
    message.to_string()
}

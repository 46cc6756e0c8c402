//! Handler block extraction for HTTP request files.
//!
//! Request definitions may carry embedded post-response scripts, delimited
//! by a line-leading `>` marker and a `{% ... %}` pair:
//!
//! ```text
//! POST https://api.example.com/auth/login
//! Content-Type: application/json
//!
//! {"username": "test", "password": "pass"}
//!
//! > {%
//!   const body = response.json();
//!   client.global.set("authToken", body.token);
//! %}
//! ```
//!
//! This module extracts the raw script text from definition text in a
//! single linear pass, preserving exact whitespace and Unicode between the
//! delimiters. Script content is untrusted at this stage; extraction never
//! interprets it.

pub mod error;

pub use error::HandlerParseError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex matching the closing delimiter's characters with whitespace
/// inserted between them (`% }`), a visually similar but invalid pattern
/// that is reported distinctly from a missing closing marker.
static MALFORMED_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\s+\}").expect("Failed to compile malformed close regex"));

/// Separator between request definitions in a file.
const DEFINITION_SEPARATOR: &str = "###";

/// An extracted handler script attached to a request definition.
///
/// Immutable once parsed; a reload of the definition produces new blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerBlock {
    /// Script text between the `{%` and `%}` delimiters, trimmed of
    /// surrounding whitespace only. Interior whitespace, Unicode, and
    /// literal nested braces are preserved exactly.
    pub script: String,

    /// Line number of the `> {%` marker line in the source (1-based).
    pub start_line: usize,
}

/// Extraction outcome for a single request definition within a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionHandlers {
    /// Zero-based position of the definition in the file.
    pub index: usize,

    /// Line number where the definition starts (1-based).
    pub start_line: usize,

    /// The definition's handler blocks, or the diagnostic that stopped
    /// extraction for this definition. Sibling definitions are unaffected.
    pub outcome: Result<Vec<HandlerBlock>, HandlerParseError>,
}

/// Extracts all handler blocks from a single request definition's text.
///
/// Scans line by line for a line whose first non-whitespace character is
/// `>` and which contains the opening delimiter `{%`. Subsequent lines are
/// accumulated verbatim until a line containing the closing delimiter `%}`.
/// The script is the substring strictly between the first `{%` and the
/// first `%}` in the accumulated buffer, trimmed of outer whitespace.
///
/// A definition with no blocks is not an error; the result is simply empty.
/// Blocks are returned in source order with their starting line numbers.
///
/// # Anomaly precedence
///
/// When several marker anomalies could apply, precedence is deterministic:
/// a line containing a literal `%}` always finalizes the block (which may
/// then yield `MarkersOutOfOrder`); only a line without `%}` is tested for
/// the malformed `% }` pattern; `MissingClosingMarker` is the end-of-input
/// fallback.
///
/// # Arguments
///
/// * `text` - The request definition text to scan
///
/// # Returns
///
/// All handler blocks in source order, or the first marker diagnostic.
///
/// # Examples
///
/// ```
/// use rest_hooks::handler::parse_handler_blocks;
///
/// let text = "GET https://api.example.com/users\n\n> {%\n  client.session.set(\"n\", \"1\");\n%}\n";
/// let blocks = parse_handler_blocks(text).unwrap();
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].start_line, 3);
/// assert!(blocks[0].script.contains("client.session.set"));
/// ```
pub fn parse_handler_blocks(text: &str) -> Result<Vec<HandlerBlock>, HandlerParseError> {
    // Normalize line endings (handle both \r\n and \n)
    let normalized = text.replace("\r\n", "\n");
    let lines: Vec<(usize, &str)> = normalized
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .collect();

    extract_blocks(&lines)
}

/// Extracts handler blocks per request definition across a whole file.
///
/// Definitions are separated by lines containing only `###`, matching the
/// request-file convention. Each definition is scanned independently: a
/// marker diagnostic in one definition is reported in its own outcome and
/// never aborts extraction for the others.
///
/// # Arguments
///
/// * `content` - The full request file content
///
/// # Returns
///
/// One `DefinitionHandlers` per non-blank definition, in file order, with
/// block line numbers absolute within the file.
pub fn parse_file_handlers(content: &str) -> Vec<DefinitionHandlers> {
    let normalized = content.replace("\r\n", "\n");

    let mut results = Vec::new();
    let mut current_block: Vec<(usize, &str)> = Vec::new();
    let mut block_start_line = 1;
    let mut current_line = 1;

    for line in normalized.lines() {
        if line.trim() == DEFINITION_SEPARATOR {
            push_definition(&mut results, &current_block, block_start_line);
            current_block.clear();
            block_start_line = current_line + 1;
        } else {
            current_block.push((current_line, line));
        }
        current_line += 1;
    }
    push_definition(&mut results, &current_block, block_start_line);

    results
}

/// Appends an extraction outcome for one definition, skipping blank ones.
fn push_definition(
    results: &mut Vec<DefinitionHandlers>,
    lines: &[(usize, &str)],
    start_line: usize,
) {
    if lines.iter().all(|(_, line)| line.trim().is_empty()) {
        return;
    }

    results.push(DefinitionHandlers {
        index: results.len(),
        start_line,
        outcome: extract_blocks(lines),
    });
}

/// Single-pass block extraction over numbered lines.
fn extract_blocks(lines: &[(usize, &str)]) -> Result<Vec<HandlerBlock>, HandlerParseError> {
    let mut blocks = Vec::new();
    // (start line, accumulated lines) of the block currently being collected
    let mut open: Option<(usize, Vec<&str>)> = None;

    for (line_num, line) in lines {
        if let Some((start_line, buffer)) = open.as_mut() {
            buffer.push(line);

            if line.contains("%}") {
                let start_line = *start_line;
                let buffer = std::mem::take(buffer);
                open = None;
                blocks.push(finalize_block(start_line, &buffer)?);
            } else if MALFORMED_CLOSE_REGEX.is_match(line) {
                return Err(HandlerParseError::MalformedClosingMarker { line: *line_num });
            }
        } else if line.trim_start().starts_with('>') && line.contains("{%") {
            if line.contains("%}") {
                // Single-line block: delimiters open and close on the marker line
                blocks.push(finalize_block(*line_num, &[line])?);
            } else {
                open = Some((*line_num, vec![line]));
            }
        }
    }

    if let Some((start_line, _)) = open {
        return Err(HandlerParseError::MissingClosingMarker { line: start_line });
    }

    Ok(blocks)
}

/// Cuts the script out of an accumulated block buffer.
///
/// The buffer is guaranteed by the caller to contain both delimiters.
fn finalize_block(start_line: usize, buffer: &[&str]) -> Result<HandlerBlock, HandlerParseError> {
    let joined = buffer.join("\n");

    let open_idx = joined
        .find("{%")
        .expect("block buffer must contain an opening delimiter");
    let close_idx = joined
        .find("%}")
        .expect("block buffer must contain a closing delimiter");

    if close_idx <= open_idx {
        return Err(HandlerParseError::MarkersOutOfOrder { line: start_line });
    }

    let script = joined[open_idx + 2..close_idx].trim().to_string();

    Ok(HandlerBlock { script, start_line })
}

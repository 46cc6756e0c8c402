//! Line-oriented `KEY=VALUE` variable file support.
//!
//! The persistent tier of the variable store is backed by a plain text
//! file, one variable per line. Blank lines and lines starting with `#` are
//! ignored on read, and values may be wrapped in matching single or double
//! quotes, which are stripped.

use super::error::StoreError;
use super::PersistentWriter;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Parses variable file content into a key/value map.
///
/// Blank lines and `#` comment lines are skipped. Each remaining line is
/// split on the first `=`; lines without one are ignored. Values wrapped in
/// matching single or double quotes are unwrapped. Later lines win on
/// duplicate keys.
///
/// # Arguments
///
/// * `content` - The full variable file content
///
/// # Examples
///
/// ```
/// use rest_hooks::store::env_file;
///
/// let content = "# auth\nTOKEN=abc123\nGREETING=\"hello world\"\n\nEMPTY=\n";
/// let vars = env_file::parse(content);
/// assert_eq!(vars.get("TOKEN").unwrap(), "abc123");
/// assert_eq!(vars.get("GREETING").unwrap(), "hello world");
/// assert_eq!(vars.get("EMPTY").unwrap(), "");
/// ```
pub fn parse(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            vars.insert(key.to_string(), unquote(value.trim()).to_string());
        }
    }

    vars
}

/// Serializes a variable map to file content with deterministic key order.
///
/// Values containing `#`, `=`, or leading/trailing whitespace are wrapped
/// in double quotes so they survive a read back. Control characters are
/// stripped from values; the format is line-based and cannot carry them.
pub fn serialize(vars: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = vars.keys().collect();
    keys.sort();

    let mut out = String::new();
    for key in keys {
        let value: String = vars[key].chars().filter(|c| !c.is_control()).collect();
        if needs_quoting(&value) {
            out.push_str(&format!("{}=\"{}\"\n", key, value));
        } else {
            out.push_str(&format!("{}={}\n", key, value));
        }
    }
    out
}

/// Loads a variable file, returning an empty map if the file is absent.
///
/// A missing file is the normal first-run state, not an error; any other
/// IO failure is propagated.
pub fn load(path: &Path) -> Result<HashMap<String, String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse(&content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(err) => Err(err.into()),
    }
}

/// Strips one pair of matching single or double quotes from a value.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Whether a value must be quoted to round-trip through the file format.
fn needs_quoting(value: &str) -> bool {
    value.contains('#')
        || value.contains('=')
        || value != value.trim()
        || (value.len() >= 2
            && ((value.starts_with('\'') && value.ends_with('\''))
                || (value.starts_with('"') && value.ends_with('"'))))
}

/// Durable-write collaborator backed by a `KEY=VALUE` file.
///
/// Each write is a read-modify-write of the whole file under an internal
/// mutex, so concurrent persistent writes from parallel handler executions
/// serialize instead of clobbering each other.
#[derive(Debug)]
pub struct EnvFileWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EnvFileWriter {
    /// Creates a writer targeting the given variable file.
    ///
    /// The file does not need to exist yet; it is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistentWriter for EnvFileWriter {
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::WriteRejected(e.to_string()))?;

        let mut vars = load(&self.path)?;
        vars.insert(key.to_string(), value.to_string());
        fs::write(&self.path, serialize(&vars))?;
        Ok(())
    }
}

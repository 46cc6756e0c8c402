//! Layered session + persistent variable storage.
//!
//! Handler scripts capture values from responses (auth tokens, entity ids)
//! and store them for later requests. Two tiers exist:
//!
//! - **session**: volatile, in-process, cleared on demand or at restart;
//! - **persistent**: survives restarts through a pluggable durable-write
//!   collaborator, typically an [`env_file::EnvFileWriter`].
//!
//! A [`VariableStore`] is an explicitly constructed, cloneable handle; there
//! is no ambient singleton. Concurrent handler executions share one store,
//! and per-key writes are atomic (mutex-guarded, deterministic
//! last-write-wins).

pub mod env_file;
pub mod error;

pub use error::StoreError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Durable-write collaborator invoked on every persistent-tier write.
///
/// The store reports a persistent `set` as successful only after this hook
/// accepts the write. Implemented by [`env_file::EnvFileWriter`] and by any
/// plain closure of the matching shape.
pub trait PersistentWriter: Send + Sync {
    /// Persists one sanitized key/value pair.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<F> PersistentWriter for F
where
    F: Fn(&str, &str) -> Result<(), StoreError> + Send + Sync,
{
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self(key, value)
    }
}

/// Layered key/value store shared across handler executions.
///
/// Cloning the store clones the handle, not the data: all clones observe
/// the same tiers. An explicitly-set empty string is a present value,
/// distinguishable from an absent key.
#[derive(Clone)]
pub struct VariableStore {
    session: Arc<Mutex<HashMap<String, String>>>,
    persistent: Arc<Mutex<HashMap<String, String>>>,
    writer: Arc<dyn PersistentWriter>,
}

impl VariableStore {
    /// Creates a store with an empty persistent tier backed by `writer`.
    pub fn new(writer: Arc<dyn PersistentWriter>) -> Self {
        Self::with_persistent(writer, HashMap::new())
    }

    /// Creates a store with a preloaded persistent tier.
    ///
    /// # Arguments
    ///
    /// * `writer` - Durable-write collaborator for future persistent writes
    /// * `persistent` - Initial persistent-tier contents, e.g. from
    ///   [`env_file::load`]
    pub fn with_persistent(
        writer: Arc<dyn PersistentWriter>,
        persistent: HashMap<String, String>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(HashMap::new())),
            persistent: Arc::new(Mutex::new(persistent)),
            writer,
        }
    }

    /// Creates a store whose persistent writes succeed without touching
    /// disk. Useful for tests and ephemeral sessions.
    pub fn in_memory() -> Self {
        fn accept(_key: &str, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }
        Self::new(Arc::new(accept))
    }

    /// Resolves a key, checking the session tier first and falling through
    /// to the persistent tier.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.get_session(key) {
            return Some(value);
        }
        self.get_persistent(key)
    }

    /// Reads a key from the session tier only.
    pub fn get_session(&self, key: &str) -> Option<String> {
        self.session.lock().ok()?.get(key).cloned()
    }

    /// Reads a key from the persistent tier only.
    pub fn get_persistent(&self, key: &str) -> Option<String> {
        self.persistent.lock().ok()?.get(key).cloned()
    }

    /// Returns a merged view of both tiers, with session entries overlaying
    /// persistent entries of the same key.
    pub fn get_all(&self) -> HashMap<String, String> {
        let mut merged = self
            .persistent
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        if let Ok(session) = self.session.lock() {
            for (key, value) in session.iter() {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    /// Writes a key to the session tier.
    ///
    /// Synchronous and immediately observable by other holders of the
    /// store handle. Writes to a given key are atomic: concurrent callers
    /// see deterministic last-write-wins, never a torn value.
    pub fn set_session(&self, key: &str, value: &str) {
        if let Ok(mut session) = self.session.lock() {
            session.insert(key.to_string(), value.to_string());
        }
    }

    /// Writes a key to the persistent tier.
    ///
    /// The key is sanitized first (control characters stripped, so a key
    /// cannot inject lines into the line-based backing format), then the
    /// durable-write collaborator is invoked. Only once the collaborator
    /// accepts the write is the in-memory persistent tier updated; a
    /// rejected write leaves the tier unchanged and is reported to the
    /// caller.
    pub fn set_persistent(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = sanitize_key(key);
        self.writer.write(&key, value)?;

        if let Ok(mut persistent) = self.persistent.lock() {
            persistent.insert(key, value.to_string());
        }
        Ok(())
    }

    /// Checks whether a key exists in either tier.
    ///
    /// An explicitly-set empty string counts as present.
    pub fn has(&self, key: &str) -> bool {
        self.session
            .lock()
            .map(|s| s.contains_key(key))
            .unwrap_or(false)
            || self
                .persistent
                .lock()
                .map(|p| p.contains_key(key))
                .unwrap_or(false)
    }

    /// Clears the session tier. The persistent tier is never affected.
    pub fn clear_session(&self) {
        if let Ok(mut session) = self.session.lock() {
            session.clear();
        }
    }
}

impl std::fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableStore")
            .field("session_keys", &self.session.lock().map(|s| s.len()))
            .field("persistent_keys", &self.persistent.lock().map(|p| p.len()))
            .finish()
    }
}

/// Strips control characters (line breaks, tabs, NULs) from a key so it
/// cannot break the line-oriented backing format.
fn sanitize_key(key: &str) -> String {
    key.chars().filter(|c| !c.is_control()).collect()
}

//! Response snapshot data model.
//!
//! This module defines the immutable view of an HTTP response that handler
//! scripts run against. The transport layer (redirect following,
//! decompression, body decoding) is an external collaborator: by the time a
//! snapshot is constructed, the body has already been decoded to text.

use serde::{Deserialize, Serialize};

/// A read-only snapshot of a finished HTTP response.
///
/// Headers are kept as an ordered list of `(name, value)` pairs rather than
/// a map so that duplicate headers (e.g. multiple `Set-Cookie` lines) are
/// preserved in arrival order. Lookups return the first match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status: u16,

    /// Response headers in arrival order. Duplicates are preserved.
    pub headers: Vec<(String, String)>,

    /// Response body, decoded to text by the transport collaborator.
    pub body: String,
}

impl ResponseSnapshot {
    /// Creates a new snapshot with the given status and no headers or body.
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    ///
    /// # Returns
    ///
    /// A new `ResponseSnapshot` with empty headers and body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header, preserving arrival order.
    ///
    /// # Arguments
    ///
    /// * `name` - Header name
    /// * `value` - Header value
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Sets the response body text.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Looks up a header by exact, case-sensitive name.
    ///
    /// This is the lookup exposed to handler scripts. Returns the first
    /// value for the name, or `None` if the header is not present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up a header by ASCII case-insensitive name.
    ///
    /// Used by display layers where HTTP's case-insensitive header
    /// semantics are wanted; scripts get the exact-case `header` lookup.
    pub fn header_ci(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets the Content-Type header value if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header_ci("content-type")
    }

    /// Checks if the response status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

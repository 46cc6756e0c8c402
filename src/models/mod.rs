//! Core data models for post-response handler execution.
//!
//! This module defines the read-only response snapshot that is handed to
//! handler scripts after the transport layer has finished a request.

pub mod response;

pub use response::ResponseSnapshot;

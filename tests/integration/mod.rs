//! Integration tests module for the handler pipeline
//!
//! This module provides common utilities and test infrastructure
//! for integration testing of the post-response handler pipeline.

pub mod persistence_test;
pub mod pipeline_test;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        // Initialize global test setup if needed
    });
}

//! Integration tests for querywright.
//!
//! These run against real SQLite files in temp directories, with the LLM
//! backend mocked, so no network or external service is required.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;

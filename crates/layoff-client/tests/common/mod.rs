//! Shared utilities for layoff-client integration tests.
//!
//! This module provides:
//! - `TestHarness`, a fresh `AppContext` per test over scripted collaborators
//! - Builders for application and dashboard payloads

pub mod builders;
pub mod harness;

#[allow(unused_imports)]
pub use builders::*;
pub use harness::TestHarness;

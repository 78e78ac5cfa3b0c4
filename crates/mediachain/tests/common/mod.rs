//! Shared test utilities for mediachain integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp data, upload and object directories
//! - `ConfigBuilder` for assembling engine configurations programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{FakeEncoder, TestHarness};

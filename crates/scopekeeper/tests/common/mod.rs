//! Shared test utilities for scopekeeper integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring controllers to an in-memory service
//! - Builders for valid desired states of every resource kind

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;

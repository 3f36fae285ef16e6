//! Mock stats source for testing.
//!
//! This module provides `MockSource` and pre-built scenarios for testing the
//! plugin without a running Puma control server.

mod scenarios;
mod source;

pub use source::MockSource;

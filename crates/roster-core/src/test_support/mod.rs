//! Test doubles for the driver and connectors
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for dependent crates.

pub mod mocks;

pub use mocks::{CallLog, NoopConnector, ScriptedPrompter, StubConnector};

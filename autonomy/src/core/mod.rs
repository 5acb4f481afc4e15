//! Deterministic, pure logic shared by the mission core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod context;
pub mod contract;
pub mod injection;
pub mod limits;
pub mod redact;
pub mod tags;
pub mod trigger;
pub mod types;

//! Bounded autonomous missions: contracts, a limit-enforcing runner, sandboxed
//! tools, approval gates and a safety shield.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (contracts, limits, tags, context
//!   selection, redaction). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (config file, child processes,
//!   filesystem containment, tools, approval gates, agents).
//!
//! Orchestration modules ([`mission`], [`shield`], [`queue`], [`inbound`])
//! wire core logic to the collaborators.

pub mod core;
pub mod exit_codes;
pub mod inbound;
pub mod io;
pub mod logging;
pub mod mission;
pub mod queue;
pub mod shield;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

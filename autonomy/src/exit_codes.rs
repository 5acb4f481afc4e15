//! Stable exit codes for autonomy CLI commands.

/// Command succeeded, the mission completed, or the message was passed through.
pub const OK: i32 = 0;
/// Command failed due to invalid config, arguments, input files or other errors.
pub const INVALID: i32 = 1;
/// The mission ended early on a limit or an agent failure.
pub const STOPPED: i32 = 2;
/// The actor is over its inbound rate limit.
pub const RATE_LIMITED: i32 = 3;

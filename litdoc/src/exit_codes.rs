//! Stable exit codes for the `litdoc` binary.

/// Batch completed (individual documents may still have failed), or usage was printed.
pub const OK: i32 = 0;
/// The driver itself failed: invalid config, unreadable inputs, or similar.
pub const FAILED: i32 = 1;
/// A revert failed; the batch stopped because chain state is unknown.
pub const ISOLATION_LOST: i32 = 2;

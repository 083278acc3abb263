//! Deterministic, pure logic shared by the renderer.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! text and return deterministic outputs suitable for tests.

pub mod directive;
pub mod markdown;
pub mod paths;
pub mod realign;
pub mod segment;
pub mod separator;
pub mod unit;

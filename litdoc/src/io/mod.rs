//! I/O helpers for the renderer: files, processes and the shared chain.

pub mod chain;
pub mod config;
pub mod executor;
pub mod files;
pub mod isolation;
pub mod preprocess;
pub mod process;

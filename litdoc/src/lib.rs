//! Literate documentation renderer.
//!
//! Source documents mix prose (in `/* === ... === */` blocks) with runnable
//! code. Rendering a document executes its code as one program against a
//! shared forked chain and produces markdown interleaving each code segment
//! with the output it printed. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (splitting, directives, import
//!   rewriting, realignment, markdown). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (files, child processes, JSON-RPC).
//!   Behind traits where tests need to substitute them.
//!
//! Orchestration modules ([`render`], [`batch`]) coordinate core logic with
//! I/O to implement the CLI.

pub mod batch;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#![forbid(unsafe_code)]

//! Headless replay of recorded parameter traffic.
//!
//! Loads a composition snapshot and a JSON-lines trace of updates, drives a
//! [`Mirror`](showmirror_runtime::Mirror) against a simulated clock, and
//! prints every subscription change, definition list and value flush as JSON
//! lines on stdout. Diagnostics go to stderr through `tracing`.

pub mod cli;
pub mod error;
pub mod replay;

pub use cli::run_from_env;
pub use error::{ReplayError, Result};

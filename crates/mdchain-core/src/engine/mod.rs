//! # Engine Module
//!
//! Runtime machinery shared by every workflow: validated configuration, the error taxonomy,
//! progress events, per-iteration state, cooperative cancellation and supervision of the
//! external simulation program.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Builders for chain, coupling and preparation runs
//! - **Error Handling** ([`error`]) - [`error::EngineError`] and its copyable [`error::FailureKind`]
//! - **Process Supervision** ([`process`]) - The [`process::EngineRunner`] seam and its
//!   subprocess implementation
//! - **State Tracking** ([`state`]) - Paths of one iteration and the terminal outcome of a run
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Cancellation** ([`cancel`]) - A token checked between and during invocations

pub mod cancel;
pub mod config;
pub mod error;
pub mod process;
pub mod progress;
pub mod state;

//! Stateless building blocks shared by every workflow.
//!
//! Nothing in this layer spawns processes or keeps state between calls. Templates are parsed
//! once and rendered as pure functions, naming is a deterministic mapping from iteration
//! indices to paths, and the structure readers are single-pass parsers.

pub mod cdft;
pub mod io;
pub mod marker;
pub mod naming;
pub mod structure;
pub mod template;
pub mod utils;

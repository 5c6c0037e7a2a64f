//! Placeholder templates for engine input files.
//!
//! A template is an immutable skeleton with `{READ}`/`{WRITE}`-style tokens. It is validated
//! when parsed, so a chain of thousands of segments cannot fail halfway through because of a
//! misspelled token.

pub mod lammps;
pub mod placeholder;

pub use placeholder::{Bindings, Placeholder, Template, TemplateError};

//! Debouncing wrappers for noisy mechanical inputs.

mod timed;

pub use timed::*;

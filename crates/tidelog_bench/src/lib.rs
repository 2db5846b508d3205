//! Shared helpers for tidelog benchmarks.

#![warn(missing_docs)]

pub mod utils;

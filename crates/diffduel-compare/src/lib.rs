//! Dual-algorithm diff comparison.
//!
//! For every modified file of every commit, diff it with Myers and with
//! Histogram, classify the file, and record whether the two outputs are
//! textually identical. Results are persisted as a CSV dataset.

pub mod classify;
pub mod dataset;
pub mod engine;
pub mod pipeline;

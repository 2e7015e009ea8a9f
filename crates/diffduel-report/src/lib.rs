//! Aggregation and presentation of a comparison dataset.
//!
//! - [`stats`]: totals and rates grouped by repository and file type
//! - [`summary`]: console report in text, JSON or Markdown
//! - [`chart`]: the four-panel PNG chart

pub mod chart;
pub mod stats;
pub mod summary;

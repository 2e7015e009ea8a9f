//! Core types, configuration, and error handling for diffduel.
//!
//! This crate provides the shared foundation used by all other diffduel crates:
//! - [`DuelError`]: unified error type using `thiserror`
//! - [`DuelConfig`]: configuration loaded from `.diffduel.toml`
//! - Shared types: [`DiffAlgorithm`], [`FileCategory`], [`Discrepancy`],
//!   [`ComparisonRecord`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    DuelConfig, OutputConfig, ReportConfig, RepositorySpec, TraversalConfig, TraversalOrder,
};
pub use error::DuelError;
pub use types::{
    file_extension, truncate_message, ComparisonRecord, DiffAlgorithm, Discrepancy, FileCategory,
    OutputFormat, MESSAGE_LIMIT, TRUNCATION_MARKER,
};

/// A convenience `Result` type for diffduel operations.
pub type Result<T> = std::result::Result<T, DuelError>;

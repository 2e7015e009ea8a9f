use std::path::PathBuf;

/// Errors that can occur across diffduel.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary reports it through `miette`, with a help line on the
/// variants a user can fix.
///
/// Per-file diff failures are deliberately absent: they are ordinary values
/// of `DiffOutcome` and never abort a traversal.
///
/// # Examples
///
/// ```
/// use diffduel_core::DuelError;
///
/// let err = DuelError::Config("no repositories configured".into());
/// assert!(err.to_string().contains("no repositories"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DuelError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(diffduel::config))]
    Config(String),

    /// Git operation failure (opening a repository, walking history).
    #[error("git error: {0}")]
    #[diagnostic(code(diffduel::git))]
    Git(String),

    /// CSV dataset read or write failure.
    #[error("dataset error: {0}")]
    Dataset(#[from] csv::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(
        code(diffduel::file_not_found),
        help("run 'diffduel analyze' first, or point --dataset at an existing file")
    )]
    FileNotFound(PathBuf),

    /// The dataset exists but holds no records.
    #[error("dataset is empty: {}", .0.display())]
    #[diagnostic(
        code(diffduel::empty_dataset),
        help("the analysis produced no records; check the repository paths and commit cap")
    )]
    EmptyDataset(PathBuf),

    /// Chart rendering failure.
    #[error("chart error: {0}")]
    #[diagnostic(code(diffduel::chart))]
    Chart(String),
}

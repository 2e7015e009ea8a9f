use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DuelError;

/// Top-level configuration loaded from `.diffduel.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use diffduel_core::DuelConfig;
///
/// let config = DuelConfig::default();
/// assert!(config.repositories.is_empty());
/// assert_eq!(config.traversal.max_commits, 1000);
/// assert_eq!(config.report.min_samples, 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuelConfig {
    /// Repositories to mine, processed in this order.
    #[serde(default)]
    pub repositories: Vec<RepositorySpec>,
    /// Commit traversal settings.
    #[serde(default)]
    pub traversal: TraversalConfig,
    /// Output file locations.
    #[serde(default)]
    pub output: OutputConfig,
    /// Report and chart settings.
    #[serde(default)]
    pub report: ReportConfig,
}

impl DuelConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::Io`] if the file cannot be read, or
    /// [`DuelError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use diffduel_core::DuelConfig;
    /// use std::path::Path;
    ///
    /// let config = DuelConfig::from_file(Path::new(".diffduel.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, DuelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffduel_core::DuelConfig;
    ///
    /// let toml = r#"
    /// [[repositories]]
    /// name = "nginx"
    /// path = "/srv/nginx"
    /// "#;
    /// let config = DuelConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.repositories[0].name, "nginx");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, DuelError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Names of the configured repositories, in processing order.
    pub fn repository_names(&self) -> Vec<String> {
        self.repositories.iter().map(|r| r.name.clone()).collect()
    }
}

/// A named repository checkout to mine.
///
/// Parses from `NAME=PATH` so it can be passed on the command line.
///
/// # Examples
///
/// ```
/// use diffduel_core::RepositorySpec;
///
/// let spec: RepositorySpec = "fastapi=/srv/fastapi".parse().unwrap();
/// assert_eq!(spec.name, "fastapi");
/// assert_eq!(spec.path.to_str(), Some("/srv/fastapi"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    /// Name used in the dataset's `repository` column.
    pub name: String,
    /// Filesystem path of the checkout.
    pub path: PathBuf,
}

impl FromStr for RepositorySpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, path)) = s.split_once('=') else {
            return Err(format!("expected NAME=PATH, got '{s}'"));
        };
        let name = name.trim();
        let path = path.trim();
        if name.is_empty() || path.is_empty() {
            return Err(format!("expected NAME=PATH, got '{s}'"));
        }
        Ok(Self {
            name: name.to_string(),
            path: PathBuf::from(path),
        })
    }
}

/// Order in which commits are enumerated before the cap is applied.
///
/// # Examples
///
/// ```
/// use diffduel_core::TraversalOrder;
///
/// let order: TraversalOrder = "newest-first".parse().unwrap();
/// assert_eq!(order, TraversalOrder::NewestFirst);
/// assert_eq!(TraversalOrder::default(), TraversalOrder::OldestFirst);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalOrder {
    /// From the root commit towards `HEAD`.
    #[default]
    OldestFirst,
    /// From `HEAD` back towards the root.
    NewestFirst,
}

impl fmt::Display for TraversalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalOrder::OldestFirst => write!(f, "oldest-first"),
            TraversalOrder::NewestFirst => write!(f, "newest-first"),
        }
    }
}

impl FromStr for TraversalOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oldest-first" | "oldest" => Ok(TraversalOrder::OldestFirst),
            "newest-first" | "newest" => Ok(TraversalOrder::NewestFirst),
            other => Err(format!("unknown traversal order: {other}")),
        }
    }
}

/// Commit traversal configuration.
///
/// # Examples
///
/// ```
/// use diffduel_core::TraversalConfig;
///
/// let config = TraversalConfig::default();
/// assert_eq!(config.max_commits, 1000);
/// assert!(!config.include_merges);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Commit cap per repository (default: 1000).
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    /// Enumeration order (default: oldest first).
    #[serde(default)]
    pub order: TraversalOrder,
    /// List modified files for merge commits against their first parent
    /// (default: false, merges report no files).
    #[serde(default)]
    pub include_merges: bool,
}

fn default_max_commits() -> usize {
    1000
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_commits: default_max_commits(),
            order: TraversalOrder::default(),
            include_merges: false,
        }
    }
}

/// Output file locations.
///
/// # Examples
///
/// ```
/// use diffduel_core::OutputConfig;
///
/// let config = OutputConfig::default();
/// assert_eq!(config.dataset.to_str(), Some("dataset.csv"));
/// assert_eq!(config.chart.to_str(), Some("Figure_1.png"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV dataset path (default: `dataset.csv`).
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,
    /// Chart image path (default: `Figure_1.png`).
    #[serde(default = "default_chart")]
    pub chart: PathBuf,
}

fn default_dataset() -> PathBuf {
    PathBuf::from("dataset.csv")
}

fn default_chart() -> PathBuf {
    PathBuf::from("Figure_1.png")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            chart: default_chart(),
        }
    }
}

/// Report and chart configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Minimum records a file category needs to appear in the chart (default: 10).
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Chart width in pixels (default: 2400).
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,
    /// Chart height in pixels (default: 2000).
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

fn default_min_samples() -> usize {
    10
}

fn default_chart_width() -> u32 {
    2400
}

fn default_chart_height() -> u32 {
    2000
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

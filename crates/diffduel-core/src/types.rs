use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Longest commit message, in characters, stored in a record.
pub const MESSAGE_LIMIT: usize = 100;

/// Suffix appended to a commit message cut at [`MESSAGE_LIMIT`].
pub const TRUNCATION_MARKER: &str = "...";

/// Line-diff strategy handed to the diff tool.
///
/// # Examples
///
/// ```
/// use diffduel_core::DiffAlgorithm;
///
/// assert_eq!(DiffAlgorithm::Histogram.as_str(), "histogram");
/// assert_eq!("myers".parse::<DiffAlgorithm>().unwrap(), DiffAlgorithm::Myers);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    /// Classic O(ND) shortest edit script.
    Myers,
    /// Histogram diff, anchored on low-occurrence lines.
    Histogram,
}

impl DiffAlgorithm {
    /// Both algorithms, in the order they are invoked.
    pub const ALL: [DiffAlgorithm; 2] = [DiffAlgorithm::Myers, DiffAlgorithm::Histogram];

    /// Name as understood by `git diff --diff-algorithm`.
    pub fn as_str(self) -> &'static str {
        match self {
            DiffAlgorithm::Myers => "myers",
            DiffAlgorithm::Histogram => "histogram",
        }
    }
}

impl fmt::Display for DiffAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "myers" => Ok(DiffAlgorithm::Myers),
            "histogram" => Ok(DiffAlgorithm::Histogram),
            other => Err(format!("unknown diff algorithm: {other}")),
        }
    }
}

/// Coarse file-type label assigned from a path.
///
/// Serialized with its capitalized name (`"Source"`, `"Documentation"`, ...)
/// to match the dataset's `file_type` column.
///
/// # Examples
///
/// ```
/// use diffduel_core::FileCategory;
///
/// assert_eq!(FileCategory::Documentation.to_string(), "Documentation");
/// assert_eq!("Web".parse::<FileCategory>().unwrap(), FileCategory::Web);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileCategory {
    /// Program source code.
    Source,
    /// Prose and docs.
    Documentation,
    /// Structured configuration.
    Config,
    /// Markup and stylesheets.
    Web,
    /// Test files and fixtures.
    Test,
    /// Anything else with a path.
    Other,
    /// No usable path.
    Unknown,
}

impl FileCategory {
    /// Every category, in declaration order.
    pub const ALL: [FileCategory; 7] = [
        FileCategory::Source,
        FileCategory::Documentation,
        FileCategory::Config,
        FileCategory::Web,
        FileCategory::Test,
        FileCategory::Other,
        FileCategory::Unknown,
    ];

    /// Capitalized label used in the dataset.
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Source => "Source",
            FileCategory::Documentation => "Documentation",
            FileCategory::Config => "Config",
            FileCategory::Web => "Web",
            FileCategory::Test => "Test",
            FileCategory::Other => "Other",
            FileCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown file category: {s}"))
    }
}

/// Whether the two diff algorithms produced different text.
///
/// Stored as the strings `"Yes"` / `"No"` for compatibility with existing
/// downstream tooling.
///
/// # Examples
///
/// ```
/// use diffduel_core::Discrepancy;
///
/// assert_eq!(Discrepancy::between("+a", "+a"), Discrepancy::No);
/// assert_eq!(Discrepancy::between("+a", "+b"), Discrepancy::Yes);
/// assert_eq!(Discrepancy::Yes.to_string(), "Yes");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discrepancy {
    /// The outputs differ.
    Yes,
    /// The outputs are byte-for-byte identical.
    No,
}

impl Discrepancy {
    /// Exact textual comparison of two diff outputs.
    pub fn between(myers: &str, histogram: &str) -> Self {
        if myers != histogram {
            Discrepancy::Yes
        } else {
            Discrepancy::No
        }
    }

    /// `true` for [`Discrepancy::Yes`].
    pub fn is_yes(self) -> bool {
        self == Discrepancy::Yes
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::Yes => write!(f, "Yes"),
            Discrepancy::No => write!(f, "No"),
        }
    }
}

/// One row of the dataset: a modified file in one commit, diffed twice.
///
/// Field order is the dataset's column order. Build records with
/// [`ComparisonRecord::new`], which derives `discrepancy`, `file_extension`
/// and the truncated `commit_message`.
///
/// # Examples
///
/// ```
/// use diffduel_core::{ComparisonRecord, Discrepancy, FileCategory};
///
/// let record = ComparisonRecord::new(
///     "fastapi",
///     "c0ffee",
///     "beef00",
///     "Fix typo",
///     (None, Some("docs/index.MD".into())),
///     FileCategory::Documentation,
///     ("+x\n".into(), "+x\n".into()),
/// );
/// assert_eq!(record.discrepancy, Discrepancy::No);
/// assert_eq!(record.file_extension, ".md");
/// assert_eq!(record.effective_path(), Some("docs/index.MD"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// Configured repository name.
    pub repository: String,
    /// Path before the change, absent for added files.
    pub old_file_path: Option<String>,
    /// Path after the change, absent for deleted files.
    pub new_file_path: Option<String>,
    /// Child commit SHA.
    pub commit_sha: String,
    /// First-parent SHA the diff is taken against.
    pub parent_commit_sha: String,
    /// Commit message, cut to [`MESSAGE_LIMIT`] characters plus marker.
    pub commit_message: String,
    /// Category of the effective path.
    pub file_type: FileCategory,
    /// Lowercased extension of the effective path, with the leading dot.
    pub file_extension: String,
    /// Output of the Myers diff.
    pub diff_myers: String,
    /// Output of the Histogram diff.
    pub diff_histogram: String,
    /// Whether the two outputs differ.
    pub discrepancy: Discrepancy,
}

impl ComparisonRecord {
    /// Build a record; `paths` is `(old, new)` and `diffs` is `(myers, histogram)`.
    pub fn new(
        repository: &str,
        commit_sha: &str,
        parent_commit_sha: &str,
        commit_message: &str,
        paths: (Option<String>, Option<String>),
        file_type: FileCategory,
        diffs: (String, String),
    ) -> Self {
        let (old_file_path, new_file_path) = paths;
        let (diff_myers, diff_histogram) = diffs;
        let file_extension = new_file_path
            .as_deref()
            .or(old_file_path.as_deref())
            .map(file_extension)
            .unwrap_or_default();
        let discrepancy = Discrepancy::between(&diff_myers, &diff_histogram);

        Self {
            repository: repository.to_string(),
            old_file_path,
            new_file_path,
            commit_sha: commit_sha.to_string(),
            parent_commit_sha: parent_commit_sha.to_string(),
            commit_message: truncate_message(commit_message),
            file_type,
            file_extension,
            diff_myers,
            diff_histogram,
            discrepancy,
        }
    }

    /// New path if present, else old path.
    pub fn effective_path(&self) -> Option<&str> {
        self.new_file_path
            .as_deref()
            .or(self.old_file_path.as_deref())
    }

    /// `true` when the two algorithms disagree.
    pub fn is_discrepancy(&self) -> bool {
        self.discrepancy.is_yes()
    }
}

/// Cut `message` to [`MESSAGE_LIMIT`] characters, appending
/// [`TRUNCATION_MARKER`] when anything was removed.
///
/// # Examples
///
/// ```
/// use diffduel_core::truncate_message;
///
/// assert_eq!(truncate_message("short"), "short");
/// let long = "x".repeat(150);
/// assert_eq!(truncate_message(&long), format!("{}...", "x".repeat(100)));
/// ```
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MESSAGE_LIMIT) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &message[..cut]),
        None => message.to_string(),
    }
}

/// Lowercased extension of the last path component, including the dot.
///
/// Leading dots of the file name do not start an extension, so dotfiles
/// have none.
///
/// # Examples
///
/// ```
/// use diffduel_core::file_extension;
///
/// assert_eq!(file_extension("src/Main.PY"), ".py");
/// assert_eq!(file_extension("archive.tar.gz"), ".gz");
/// assert_eq!(file_extension(".bashrc"), "");
/// assert_eq!(file_extension("Makefile"), "");
/// ```
pub fn file_extension(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name[idx..].to_lowercase(),
        _ => String::new(),
    }
}

/// Output format for CLI reports.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use diffduel_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

//! Extension-based file categories.

use diffduel_core::{file_extension, FileCategory};

/// Classify a path into a [`FileCategory`].
///
/// Extension lookups run first; only a path whose extension matched none of
/// them is checked for the substring `test`. A test module such as
/// `tests/test_api.py` is therefore `Source`, while `tests/fixtures/data.csv`
/// is `Test`. Missing or empty paths are `Unknown`.
///
/// # Examples
///
/// ```
/// use diffduel_compare::classify::classify;
/// use diffduel_core::FileCategory;
///
/// assert_eq!(classify(Some("src/main.py")), FileCategory::Source);
/// assert_eq!(classify(Some("README.md")), FileCategory::Documentation);
/// assert_eq!(classify(Some("test_foo.py")), FileCategory::Source);
/// assert_eq!(classify(None), FileCategory::Unknown);
/// ```
pub fn classify(path: Option<&str>) -> FileCategory {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return FileCategory::Unknown;
    };

    match file_extension(path).as_str() {
        ".py" | ".js" | ".c" | ".cpp" | ".java" | ".go" | ".rs" | ".php" => FileCategory::Source,
        ".md" | ".txt" | ".rst" | ".adoc" => FileCategory::Documentation,
        ".json" | ".yml" | ".yaml" | ".xml" | ".toml" | ".ini" | ".cfg" => FileCategory::Config,
        ".html" | ".css" | ".scss" => FileCategory::Web,
        _ if path.contains("test") => FileCategory::Test,
        _ => FileCategory::Other,
    }
}

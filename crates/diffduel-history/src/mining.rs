//! Commit traversal via git2.
//!
//! Enumerates a bounded, ordered slice of a repository's history and lists
//! the files each commit modified relative to its first parent. No diff
//! text is produced here; this is a pure metadata walk.

use std::path::Path;

use diffduel_core::{DuelError, TraversalConfig, TraversalOrder};
use git2::{Delta, DiffFindOptions, DiffOptions, ErrorCode, Repository, Sort};
use serde::Serialize;

/// Commit metadata needed to diff its files.
///
/// # Examples
///
/// ```
/// use diffduel_history::mining::{CommitInfo, ModifiedFile};
///
/// let info = CommitInfo {
///     hash: "abc123".into(),
///     parents: vec!["def456".into()],
///     message: "fix: auth bug".into(),
///     modified_files: vec![ModifiedFile::new(None, Some("src/auth.py".into()))],
/// };
/// assert_eq!(info.first_parent(), Some("def456"));
/// assert!(!info.is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitInfo {
    /// Full commit hash.
    pub hash: String,
    /// Parent hashes in git order.
    pub parents: Vec<String>,
    /// Full commit message, trimmed.
    pub message: String,
    /// Files changed relative to the first parent.
    pub modified_files: Vec<ModifiedFile>,
}

impl CommitInfo {
    /// The parent diffs are taken against, if any.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// `true` for commits without parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// A file touched by a commit.
///
/// Added files have no old path, deleted files have no new path, renames
/// carry both.
///
/// # Examples
///
/// ```
/// use diffduel_history::mining::ModifiedFile;
///
/// let deleted = ModifiedFile::new(Some("old.txt".into()), None);
/// assert_eq!(deleted.effective_path(), Some("old.txt"));
///
/// let renamed = ModifiedFile::new(Some("a.rs".into()), Some("b.rs".into()));
/// assert_eq!(renamed.effective_path(), Some("b.rs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifiedFile {
    /// Path before the change.
    pub old_path: Option<String>,
    /// Path after the change.
    pub new_path: Option<String>,
}

impl ModifiedFile {
    /// Create a modified-file entry.
    pub fn new(old_path: Option<String>, new_path: Option<String>) -> Self {
        Self { old_path, new_path }
    }

    /// New path if present, else old path.
    pub fn effective_path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }
}

/// Options for history traversal.
///
/// # Examples
///
/// ```
/// use diffduel_history::mining::TraversalOptions;
///
/// let opts = TraversalOptions::default();
/// assert_eq!(opts.max_commits, 1000);
/// assert!(!opts.include_merges);
/// ```
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    /// Commit cap, applied after ordering (default: 1000).
    pub max_commits: usize,
    /// Enumeration order (default: oldest first).
    pub order: TraversalOrder,
    /// List files for merge commits against their first parent (default: false).
    pub include_merges: bool,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        TraversalOptions::from(&TraversalConfig::default())
    }
}

impl From<&TraversalConfig> for TraversalOptions {
    fn from(config: &TraversalConfig) -> Self {
        Self {
            max_commits: config.max_commits,
            order: config.order,
            include_merges: config.include_merges,
        }
    }
}

/// Walk a repository's history and return at most `max_commits` commits.
///
/// Each call opens the repository afresh, so the sequence can be restarted
/// by calling again. A repository without any commit yields an empty list.
///
/// # Errors
///
/// Returns [`DuelError::Git`] if the repository cannot be opened or walked.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use diffduel_history::mining::{mine_history, TraversalOptions};
///
/// let commits = mine_history(Path::new("."), &TraversalOptions::default()).unwrap();
/// for c in &commits {
///     println!("{}: {} files", &c.hash[..7], c.modified_files.len());
/// }
/// ```
pub fn mine_history(
    repo_path: &Path,
    options: &TraversalOptions,
) -> Result<Vec<CommitInfo>, DuelError> {
    let repo = Repository::open(repo_path)
        .map_err(|e| DuelError::Git(format!("failed to open repository: {e}")))?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| DuelError::Git(format!("failed to create revwalk: {e}")))?;

    let sorting = match options.order {
        TraversalOrder::OldestFirst => Sort::TIME | Sort::REVERSE,
        TraversalOrder::NewestFirst => Sort::TIME,
    };
    revwalk.set_sorting(sorting).ok();

    // An unborn HEAD surfaces as a generic reference error from push_head,
    // so it has to be detected on the reference itself.
    match repo.head() {
        Ok(_) => {}
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            tracing::debug!(path = %repo_path.display(), "repository has no commits");
            return Ok(Vec::new());
        }
        Err(e) => return Err(DuelError::Git(format!("failed to resolve HEAD: {e}"))),
    }
    revwalk
        .push_head()
        .map_err(|e| DuelError::Git(format!("failed to push HEAD: {e}")))?;

    let mut commits = Vec::new();

    for oid_result in revwalk.take(options.max_commits) {
        let oid = oid_result.map_err(|e| DuelError::Git(format!("revwalk error: {e}")))?;

        let commit = repo
            .find_commit(oid)
            .map_err(|e| DuelError::Git(format!("failed to find commit: {e}")))?;

        let parents: Vec<String> = commit.parent_ids().map(|id| id.to_string()).collect();

        let modified_files = if parents.len() > 1 && !options.include_merges {
            Vec::new()
        } else {
            extract_modified_files(&repo, &commit)?
        };

        commits.push(CommitInfo {
            hash: oid.to_string(),
            parents,
            message: String::from_utf8_lossy(commit.message_bytes())
                .trim()
                .to_string(),
            modified_files,
        });
    }

    Ok(commits)
}

fn extract_modified_files(
    repo: &Repository,
    commit: &git2::Commit,
) -> Result<Vec<ModifiedFile>, DuelError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| DuelError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| DuelError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| DuelError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&commit_tree),
            Some(&mut diff_opts),
        )
        .map_err(|e| DuelError::Git(format!("failed to compute diff: {e}")))?;

    // Enable rename detection
    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| DuelError::Git(format!("failed to find renames: {e}")))?;

    let files = diff
        .deltas()
        .map(|delta| {
            let old_path = path_string(delta.old_file().path());
            let new_path = path_string(delta.new_file().path());
            match delta.status() {
                Delta::Added => ModifiedFile::new(None, new_path),
                Delta::Deleted => ModifiedFile::new(old_path, None),
                _ => ModifiedFile::new(old_path, new_path),
            }
        })
        .collect();

    Ok(files)
}

fn path_string(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
}

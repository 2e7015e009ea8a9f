//! Single-file diff invocation.
//!
//! A [`DiffProvider`] turns a [`DiffRequest`] into a [`DiffOutcome`]. Failure
//! is an ordinary value, never an error: renamed, deleted and binary paths
//! routinely make the diff tool fail, and that must not abort a traversal.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::Command;

use diffduel_core::DiffAlgorithm;

/// One diff to compute: `path` between `parent` and `child` with `algorithm`.
#[derive(Debug, Clone, Copy)]
pub struct DiffRequest<'a> {
    /// Root of the repository checkout.
    pub repo_root: &'a Path,
    /// Revision on the old side.
    pub parent: &'a str,
    /// Revision on the new side.
    pub child: &'a str,
    /// Repository-relative path the diff is restricted to.
    pub path: &'a str,
    /// Diff algorithm to use.
    pub algorithm: DiffAlgorithm,
}

/// Result of one diff invocation.
///
/// # Examples
///
/// ```
/// use diffduel_history::invoker::{DiffFailure, DiffOutcome};
///
/// let ok = DiffOutcome::Success("+line\n".into());
/// assert_eq!(ok.into_text().as_deref(), Some("+line\n"));
///
/// let failed = DiffOutcome::Failure(DiffFailure::MissingPrerequisite);
/// assert!(failed.into_text().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Raw diff text; may be empty when nothing survives the filters.
    Success(String),
    /// The diff could not be produced.
    Failure(DiffFailure),
}

impl DiffOutcome {
    /// The diff text, or `None` on failure.
    pub fn into_text(self) -> Option<String> {
        match self {
            DiffOutcome::Success(text) => Some(text),
            DiffOutcome::Failure(_) => None,
        }
    }

    /// `true` for [`DiffOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, DiffOutcome::Success(_))
    }
}

/// Why a diff could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffFailure {
    /// Parent revision or path was absent; the tool was not run.
    MissingPrerequisite,
    /// The tool ran and exited unsuccessfully.
    ExitStatus {
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// The tool could not be started.
    Spawn(String),
}

impl fmt::Display for DiffFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffFailure::MissingPrerequisite => write!(f, "missing parent revision or path"),
            DiffFailure::ExitStatus {
                code: Some(code),
                stderr,
            } => write!(f, "exited with status {code}: {}", stderr.trim()),
            DiffFailure::ExitStatus { code: None, stderr } => {
                write!(f, "terminated by signal: {}", stderr.trim())
            }
            DiffFailure::Spawn(reason) => write!(f, "failed to start: {reason}"),
        }
    }
}

/// Something that can diff one file between two revisions.
///
/// The comparison engine only sees this trait, so tests can substitute a
/// scripted provider for the real diff tool.
pub trait DiffProvider {
    /// Compute the diff described by `request`.
    fn diff(&self, request: &DiffRequest<'_>) -> DiffOutcome;
}

impl<P: DiffProvider + ?Sized> DiffProvider for &P {
    fn diff(&self, request: &DiffRequest<'_>) -> DiffOutcome {
        (**self).diff(request)
    }
}

/// Diff `path` between `parent` and `child`, short-circuiting when the
/// parent or the path is missing.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use diffduel_core::DiffAlgorithm;
/// use diffduel_history::invoker::{compute_diff, DiffFailure, DiffOutcome, GitCli};
///
/// let outcome = compute_diff(
///     &GitCli::new(),
///     Path::new("."),
///     None,
///     "HEAD",
///     Some("README.md"),
///     DiffAlgorithm::Myers,
/// );
/// assert_eq!(outcome, DiffOutcome::Failure(DiffFailure::MissingPrerequisite));
/// ```
pub fn compute_diff<P: DiffProvider + ?Sized>(
    provider: &P,
    repo_root: &Path,
    parent: Option<&str>,
    child: &str,
    path: Option<&str>,
    algorithm: DiffAlgorithm,
) -> DiffOutcome {
    let (Some(parent), Some(path)) = (
        parent.filter(|p| !p.is_empty()),
        path.filter(|p| !p.is_empty()),
    ) else {
        return DiffOutcome::Failure(DiffFailure::MissingPrerequisite);
    };

    provider.diff(&DiffRequest {
        repo_root,
        parent,
        child,
        path,
        algorithm,
    })
}

/// [`DiffProvider`] backed by the `git diff` command.
///
/// Whitespace-only and blank-line-only changes are ignored, colour and
/// external diff drivers are disabled.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use diffduel_core::DiffAlgorithm;
/// use diffduel_history::invoker::{DiffRequest, GitCli};
///
/// let git = GitCli::new();
/// let args = git.diff_args(&DiffRequest {
///     repo_root: Path::new("."),
///     parent: "abc",
///     child: "def",
///     path: "src/lib.rs",
///     algorithm: DiffAlgorithm::Histogram,
/// });
/// assert!(args.iter().any(|a| a == "--diff-algorithm=histogram"));
/// ```
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
}

impl GitCli {
    /// Use the `git` found on `PATH`.
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a specific git executable.
    pub fn with_program(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
        }
    }

    /// Arguments passed to git for `request`.
    pub fn diff_args(&self, request: &DiffRequest<'_>) -> Vec<OsString> {
        vec![
            "diff".into(),
            "--no-color".into(),
            "--no-ext-diff".into(),
            "-w".into(),
            "--ignore-blank-lines".into(),
            format!("--diff-algorithm={}", request.algorithm).into(),
            request.parent.into(),
            request.child.into(),
            "--".into(),
            request.path.into(),
        ]
    }

    /// Output of `git --version`, or `None` if git cannot be run.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.program).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffProvider for GitCli {
    fn diff(&self, request: &DiffRequest<'_>) -> DiffOutcome {
        let output = match Command::new(&self.program)
            .args(self.diff_args(request))
            .current_dir(request.repo_root)
            .output()
        {
            Ok(output) => output,
            Err(e) => return DiffOutcome::Failure(DiffFailure::Spawn(e.to_string())),
        };

        if output.status.success() {
            DiffOutcome::Success(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            DiffOutcome::Failure(DiffFailure::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Repository, Signature};
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    struct CountingProvider {
        calls: Cell<usize>,
    }

    impl DiffProvider for CountingProvider {
        fn diff(&self, request: &DiffRequest<'_>) -> DiffOutcome {
            self.calls.set(self.calls.get() + 1);
            DiffOutcome::Success(format!("{}:{}", request.algorithm, request.path))
        }
    }

    fn git_available() -> bool {
        GitCli::new().version().is_some()
    }

    /// Two commits touching `lib.py`; returns (dir, parent, child).
    fn two_commit_repo(before: &str, after: &str) -> (TempDir, String, String) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let signature = Signature::now("Test User", "test@example.com").unwrap();
        let mut shas = Vec::new();
        for content in [before, after] {
            fs::write(temp_dir.path().join("lib.py"), content).unwrap();
            let mut index = repo.index().unwrap();
            index.add_path(Path::new("lib.py")).unwrap();
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let parents: Vec<git2::Commit> = match repo.head() {
                Ok(head) => vec![head.peel_to_commit().unwrap()],
                Err(_) => Vec::new(),
            };
            let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
            let oid = repo
                .commit(Some("HEAD"), &signature, &signature, "edit", &tree, &parent_refs)
                .unwrap();
            shas.push(oid.to_string());
        }
        let child = shas.pop().unwrap();
        let parent = shas.pop().unwrap();
        (temp_dir, parent, child)
    }

    #[test]
    fn missing_parent_short_circuits() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let outcome = compute_diff(
            &provider,
            Path::new("."),
            None,
            "child",
            Some("a.py"),
            DiffAlgorithm::Myers,
        );
        assert_eq!(outcome, DiffOutcome::Failure(DiffFailure::MissingPrerequisite));
        assert_eq!(provider.calls.get(), 0);
    }

    #[test]
    fn missing_path_short_circuits() {
        let provider = CountingProvider { calls: Cell::new(0) };
        for path in [None, Some("")] {
            let outcome = compute_diff(
                &provider,
                Path::new("."),
                Some("parent"),
                "child",
                path,
                DiffAlgorithm::Histogram,
            );
            assert!(!outcome.is_success());
        }
        assert_eq!(provider.calls.get(), 0);
    }

    #[test]
    fn present_prerequisites_reach_provider() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let outcome = compute_diff(
            &provider,
            Path::new("."),
            Some("parent"),
            "child",
            Some("a.py"),
            DiffAlgorithm::Histogram,
        );
        assert_eq!(outcome, DiffOutcome::Success("histogram:a.py".into()));
        assert_eq!(provider.calls.get(), 1);
    }

    #[test]
    fn diff_args_restrict_to_single_path() {
        let git = GitCli::new();
        let args = git.diff_args(&DiffRequest {
            repo_root: Path::new("."),
            parent: "p",
            child: "c",
            path: "dir/file name.md",
            algorithm: DiffAlgorithm::Myers,
        });
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "diff",
                "--no-color",
                "--no-ext-diff",
                "-w",
                "--ignore-blank-lines",
                "--diff-algorithm=myers",
                "p",
                "c",
                "--",
                "dir/file name.md",
            ]
        );
    }

    #[test]
    fn unknown_program_is_spawn_failure() {
        let git = GitCli::with_program("/nonexistent/diffduel-git");
        let outcome = git.diff(&DiffRequest {
            repo_root: Path::new("."),
            parent: "p",
            child: "c",
            path: "a",
            algorithm: DiffAlgorithm::Myers,
        });
        assert!(matches!(outcome, DiffOutcome::Failure(DiffFailure::Spawn(_))));
        assert!(git.version().is_none());
    }

    #[test]
    fn git_diff_returns_text_for_both_algorithms() {
        if !git_available() {
            return;
        }
        let (dir, parent, child) = two_commit_repo("a = 1\n", "a = 1\nb = 2\n");
        for algorithm in DiffAlgorithm::ALL {
            let text = compute_diff(
                &GitCli::new(),
                dir.path(),
                Some(&parent),
                &child,
                Some("lib.py"),
                algorithm,
            )
            .into_text()
            .unwrap();
            assert!(text.contains("+b = 2"), "{algorithm}: {text}");
        }
    }

    #[test]
    fn whitespace_only_change_produces_empty_diff() {
        if !git_available() {
            return;
        }
        let (dir, parent, child) = two_commit_repo("x = 1\n", "x  =  1\n\n");
        let text = compute_diff(
            &GitCli::new(),
            dir.path(),
            Some(&parent),
            &child,
            Some("lib.py"),
            DiffAlgorithm::Myers,
        )
        .into_text()
        .unwrap();
        assert!(!text.contains("@@"), "unexpected hunk: {text}");
    }

    #[test]
    fn invalid_revision_is_exit_failure() {
        if !git_available() {
            return;
        }
        let (dir, _parent, child) = two_commit_repo("a\n", "b\n");
        let outcome = compute_diff(
            &GitCli::new(),
            dir.path(),
            Some("0000000000000000000000000000000000000bad"),
            &child,
            Some("lib.py"),
            DiffAlgorithm::Histogram,
        );
        match outcome {
            DiffOutcome::Failure(DiffFailure::ExitStatus { code, .. }) => {
                assert_ne!(code, Some(0));
            }
            other => panic!("expected exit failure, got {other:?}"),
        }
    }
}

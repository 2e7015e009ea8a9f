//! Per-repository analysis: traverse, compare, collect.
//!
//! A repository that does not exist or cannot be walked is reported and
//! skipped; it never aborts the run.

use diffduel_core::RepositorySpec;
use diffduel_history::invoker::DiffProvider;
use diffduel_history::mining::{mine_history, TraversalOptions};
use serde::Serialize;

use crate::engine::{Comparison, ComparisonEngine, ProcessStats};

/// How a repository's analysis ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum RepositoryStatus {
    /// History was walked and compared.
    Analyzed,
    /// The configured path does not exist.
    NotFound,
    /// The path exists but could not be traversed.
    Failed(String),
}

/// Result of analysing one configured repository.
#[derive(Debug, Clone)]
pub struct RepositoryOutcome {
    /// Configured repository name.
    pub name: String,
    /// How the analysis ended.
    pub status: RepositoryStatus,
    /// Records produced, in traversal order.
    pub comparison: Comparison,
}

impl RepositoryOutcome {
    fn skipped(name: &str, status: RepositoryStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            comparison: Comparison::default(),
        }
    }

    /// Counters for this repository.
    pub fn stats(&self) -> ProcessStats {
        self.comparison.stats
    }
}

/// Analyse one repository.
///
/// `on_progress` is called with `(done, total)` after each commit, where
/// `total` is the number of commits the traversal yielded.
///
/// # Examples
///
/// ```
/// use diffduel_compare::pipeline::{analyze_repository, RepositoryStatus};
/// use diffduel_core::RepositorySpec;
/// use diffduel_history::invoker::GitCli;
/// use diffduel_history::mining::TraversalOptions;
///
/// let spec: RepositorySpec = "ghost=/definitely/not/here".parse().unwrap();
/// let outcome = analyze_repository(&spec, &TraversalOptions::default(), &GitCli::new(), |_, _| {});
/// assert_eq!(outcome.status, RepositoryStatus::NotFound);
/// assert!(outcome.comparison.records.is_empty());
/// ```
pub fn analyze_repository<P, F>(
    spec: &RepositorySpec,
    options: &TraversalOptions,
    provider: P,
    mut on_progress: F,
) -> RepositoryOutcome
where
    P: DiffProvider,
    F: FnMut(usize, usize),
{
    if !spec.path.exists() {
        tracing::info!(
            repository = %spec.name,
            path = %spec.path.display(),
            "repository path not found, skipping"
        );
        return RepositoryOutcome::skipped(&spec.name, RepositoryStatus::NotFound);
    }

    let commits = match mine_history(&spec.path, options) {
        Ok(commits) => commits,
        Err(e) => {
            tracing::info!(repository = %spec.name, error = %e, "traversal failed, skipping");
            return RepositoryOutcome::skipped(&spec.name, RepositoryStatus::Failed(e.to_string()));
        }
    };

    tracing::info!(repository = %spec.name, commits = commits.len(), "traversal complete");

    let engine = ComparisonEngine::new(provider);
    let mut comparison = Comparison::default();
    let total = commits.len();
    for (index, commit) in commits.iter().enumerate() {
        engine.process_commit(
            &spec.name,
            &spec.path,
            commit,
            &mut comparison.records,
            &mut comparison.stats,
        );
        on_progress(index + 1, total);
    }

    tracing::info!(
        repository = %spec.name,
        records = comparison.stats.records,
        dropped = comparison.stats.files_dropped,
        "comparison complete"
    );

    RepositoryOutcome {
        name: spec.name.clone(),
        status: RepositoryStatus::Analyzed,
        comparison,
    }
}

//! The diff comparison engine.
//!
//! For each commit with a parent and each of its modified files that has a
//! path, the engine runs Myers then Histogram, and emits a record only if
//! both invocations succeeded. Everything is sequential and deterministic.

use std::ops::AddAssign;
use std::path::Path;

use diffduel_core::{ComparisonRecord, DiffAlgorithm};
use diffduel_history::invoker::{compute_diff, DiffOutcome, DiffProvider};
use diffduel_history::mining::CommitInfo;
use serde::Serialize;

use crate::classify::classify;

/// Counters describing what happened to the input.
///
/// # Examples
///
/// ```
/// use diffduel_compare::engine::ProcessStats;
///
/// let mut total = ProcessStats::default();
/// total += ProcessStats { commits_seen: 2, records: 3, ..ProcessStats::default() };
/// assert_eq!(total.records, 3);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStats {
    /// Commits handed to the engine.
    pub commits_seen: usize,
    /// Commits skipped for having no parent.
    pub root_commits: usize,
    /// Modified files skipped for having neither path.
    pub files_without_path: usize,
    /// Files dropped because an invocation failed.
    pub files_dropped: usize,
    /// Records emitted.
    pub records: usize,
}

impl AddAssign for ProcessStats {
    fn add_assign(&mut self, other: Self) {
        self.commits_seen += other.commits_seen;
        self.root_commits += other.root_commits;
        self.files_without_path += other.files_without_path;
        self.files_dropped += other.files_dropped;
        self.records += other.records;
    }
}

/// Records produced for one repository, plus counters.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Emitted records in traversal order.
    pub records: Vec<ComparisonRecord>,
    /// What happened to the input.
    pub stats: ProcessStats,
}

/// Runs both diff algorithms over commits through a [`DiffProvider`].
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use diffduel_compare::engine::ComparisonEngine;
/// use diffduel_history::invoker::{DiffOutcome, DiffProvider, DiffRequest};
/// use diffduel_history::mining::{CommitInfo, ModifiedFile};
///
/// struct Same;
/// impl DiffProvider for Same {
///     fn diff(&self, _request: &DiffRequest<'_>) -> DiffOutcome {
///         DiffOutcome::Success("+added line".into())
///     }
/// }
///
/// let commit = CommitInfo {
///     hash: "C".into(),
///     parents: vec!["P".into()],
///     message: "change".into(),
///     modified_files: vec![ModifiedFile::new(Some("src/main.py".into()), Some("src/main.py".into()))],
/// };
/// let engine = ComparisonEngine::new(Same);
/// let result = engine.process("demo", Path::new("."), &[commit]);
/// assert_eq!(result.records.len(), 1);
/// assert!(!result.records[0].is_discrepancy());
/// ```
#[derive(Debug, Clone)]
pub struct ComparisonEngine<P> {
    provider: P,
}

impl<P: DiffProvider> ComparisonEngine<P> {
    /// Create an engine around `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Process every commit in order.
    pub fn process(
        &self,
        repository_name: &str,
        repository_root: &Path,
        commits: &[CommitInfo],
    ) -> Comparison {
        let mut comparison = Comparison::default();
        for commit in commits {
            self.process_commit(
                repository_name,
                repository_root,
                commit,
                &mut comparison.records,
                &mut comparison.stats,
            );
        }
        comparison
    }

    /// Process one commit, appending its records to `records`.
    pub fn process_commit(
        &self,
        repository_name: &str,
        repository_root: &Path,
        commit: &CommitInfo,
        records: &mut Vec<ComparisonRecord>,
        stats: &mut ProcessStats,
    ) {
        stats.commits_seen += 1;

        let Some(parent) = commit.first_parent() else {
            stats.root_commits += 1;
            return;
        };

        for file in &commit.modified_files {
            let Some(path) = file.effective_path() else {
                stats.files_without_path += 1;
                continue;
            };

            let [myers, histogram] = DiffAlgorithm::ALL.map(|algorithm| {
                compute_diff(
                    &self.provider,
                    repository_root,
                    Some(parent),
                    &commit.hash,
                    Some(path),
                    algorithm,
                )
            });

            let (myers, histogram) = match (myers, histogram) {
                (DiffOutcome::Success(m), DiffOutcome::Success(h)) => (m, h),
                (DiffOutcome::Failure(reason), _) | (_, DiffOutcome::Failure(reason)) => {
                    tracing::debug!(
                        commit = %commit.hash,
                        path,
                        %reason,
                        "dropping file after diff failure"
                    );
                    stats.files_dropped += 1;
                    continue;
                }
            };

            records.push(ComparisonRecord::new(
                repository_name,
                &commit.hash,
                parent,
                &commit.message,
                (file.old_path.clone(), file.new_path.clone()),
                classify(Some(path)),
                (myers, histogram),
            ));
            stats.records += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffduel_core::{Discrepancy, FileCategory};
    use diffduel_history::invoker::{DiffFailure, DiffRequest};
    use diffduel_history::mining::ModifiedFile;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Scripted provider keyed by (path, algorithm); unknown keys fail.
    #[derive(Default)]
    struct ScriptedProvider {
        responses: HashMap<(String, DiffAlgorithm), Option<String>>,
        calls: RefCell<Vec<(String, DiffAlgorithm)>>,
    }

    impl ScriptedProvider {
        fn respond(mut self, path: &str, algorithm: DiffAlgorithm, text: Option<&str>) -> Self {
            self.responses
                .insert((path.to_string(), algorithm), text.map(str::to_string));
            self
        }

        fn both(self, path: &str, text: &str) -> Self {
            self.respond(path, DiffAlgorithm::Myers, Some(text))
                .respond(path, DiffAlgorithm::Histogram, Some(text))
        }
    }

    impl DiffProvider for ScriptedProvider {
        fn diff(&self, request: &DiffRequest<'_>) -> DiffOutcome {
            self.calls
                .borrow_mut()
                .push((request.path.to_string(), request.algorithm));
            match self.responses.get(&(request.path.to_string(), request.algorithm)) {
                Some(Some(text)) => DiffOutcome::Success(text.clone()),
                _ => DiffOutcome::Failure(DiffFailure::ExitStatus {
                    code: Some(128),
                    stderr: "fatal".into(),
                }),
            }
        }
    }

    fn commit(parent: Option<&str>, message: &str, files: Vec<ModifiedFile>) -> CommitInfo {
        CommitInfo {
            hash: "C".into(),
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
            message: message.into(),
            modified_files: files,
        }
    }

    fn modified(path: &str) -> ModifiedFile {
        ModifiedFile::new(Some(path.into()), Some(path.into()))
    }

    #[test]
    fn identical_output_yields_one_agreeing_record() {
        let provider = ScriptedProvider::default().both("src/main.py", "+added line");
        let engine = ComparisonEngine::new(&provider);
        let result = engine.process(
            "demo",
            Path::new("/repo"),
            &[commit(Some("P"), "msg", vec![modified("src/main.py")])],
        );

        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.repository, "demo");
        assert_eq!(record.commit_sha, "C");
        assert_eq!(record.parent_commit_sha, "P");
        assert_eq!(record.discrepancy, Discrepancy::No);
        assert_eq!(record.file_type, FileCategory::Source);
        assert_eq!(record.file_extension, ".py");
        assert_eq!(record.diff_myers, "+added line");
        assert_eq!(record.diff_histogram, "+added line");
    }

    #[test]
    fn histogram_failure_drops_the_file() {
        let provider = ScriptedProvider::default()
            .respond("src/main.py", DiffAlgorithm::Myers, Some("+added line"))
            .respond("src/main.py", DiffAlgorithm::Histogram, None);
        let engine = ComparisonEngine::new(&provider);
        let result = engine.process(
            "demo",
            Path::new("/repo"),
            &[commit(Some("P"), "msg", vec![modified("src/main.py")])],
        );

        assert!(result.records.is_empty());
        assert_eq!(result.stats.files_dropped, 1);
    }

    #[test]
    fn myers_failure_drops_the_file() {
        let provider = ScriptedProvider::default()
            .respond("a.rs", DiffAlgorithm::Myers, None)
            .respond("a.rs", DiffAlgorithm::Histogram, Some("+x"));
        let engine = ComparisonEngine::new(&provider);
        let result = engine.process(
            "demo",
            Path::new("/repo"),
            &[commit(Some("P"), "msg", vec![modified("a.rs")])],
        );
        assert!(result.records.is_empty());
        assert_eq!(result.stats.files_dropped, 1);
    }

    #[test]
    fn root_commit_emits_nothing_and_never_invokes() {
        let provider = ScriptedProvider::default()
            .both("a.py", "+a")
            .both("b.md", "+b")
            .both("c.json", "+c");
        let engine = ComparisonEngine::new(&provider);
        let files = vec![
            ModifiedFile::new(None, Some("a.py".into())),
            ModifiedFile::new(None, Some("b.md".into())),
            ModifiedFile::new(None, Some("c.json".into())),
        ];
        let result = engine.process("demo", Path::new("/repo"), &[commit(None, "init", files)]);

        assert!(result.records.is_empty());
        assert_eq!(result.stats.root_commits, 1);
        assert!(provider.calls.borrow().is_empty());
    }

    #[test]
    fn readme_with_identical_output_is_agreeing_documentation() {
        let provider = ScriptedProvider::default().both("README.md", "+docs\n");
        let engine = ComparisonEngine::new(&provider);
        let result = engine.process(
            "demo",
            Path::new("/repo"),
            &[commit(Some("P"), "docs", vec![modified("README.md")])],
        );
        assert_eq!(result.records[0].file_type, FileCategory::Documentation);
        assert_eq!(result.records[0].discrepancy, Discrepancy::No);
    }

    #[test]
    fn differing_output_is_a_discrepancy() {
        let provider = ScriptedProvider::default()
            .respond("x.go", DiffAlgorithm::Myers, Some("-a\n+b\n"))
            .respond("x.go", DiffAlgorithm::Histogram, Some("+b\n-a\n"));
        let engine = ComparisonEngine::new(&provider);
        let result = engine.process(
            "demo",
            Path::new("/repo"),
            &[commit(Some("P"), "m", vec![modified("x.go")])],
        );
        assert_eq!(result.records[0].discrepancy, Discrepancy::Yes);
    }

    #[test]
    fn pathless_file_is_skipped() {
        let provider = ScriptedProvider::default().both("a.py", "+a");
        let engine = ComparisonEngine::new(&provider);
        let files = vec![ModifiedFile::new(None, None), modified("a.py")];
        let result = engine.process("demo", Path::new("/repo"), &[commit(Some("P"), "m", files)]);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.stats.files_without_path, 1);
        assert_eq!(provider.calls.borrow().len(), 2);
    }

    #[test]
    fn deleted_file_uses_old_path() {
        let provider = ScriptedProvider::default().both("gone.css", "-body {}\n");
        let engine = ComparisonEngine::new(&provider);
        let files = vec![ModifiedFile::new(Some("gone.css".into()), None)];
        let result = engine.process("demo", Path::new("/repo"), &[commit(Some("P"), "m", files)]);

        let record = &result.records[0];
        assert_eq!(record.old_file_path.as_deref(), Some("gone.css"));
        assert_eq!(record.new_file_path, None);
        assert_eq!(record.file_type, FileCategory::Web);
    }

    #[test]
    fn myers_runs_before_histogram_for_each_file() {
        let provider = ScriptedProvider::default().both("a.py", "+a").both("b.py", "+b");
        let engine = ComparisonEngine::new(&provider);
        engine.process(
            "demo",
            Path::new("/repo"),
            &[commit(Some("P"), "m", vec![modified("a.py"), modified("b.py")])],
        );
        assert_eq!(
            *provider.calls.borrow(),
            vec![
                ("a.py".to_string(), DiffAlgorithm::Myers),
                ("a.py".to_string(), DiffAlgorithm::Histogram),
                ("b.py".to_string(), DiffAlgorithm::Myers),
                ("b.py".to_string(), DiffAlgorithm::Histogram),
            ]
        );
    }

    #[test]
    fn long_message_is_truncated_short_message_kept() {
        let provider = ScriptedProvider::default().both("a.py", "+a");
        let engine = ComparisonEngine::new(&provider);
        let long = "m".repeat(150);
        let short = "s".repeat(50);
        let result = engine.process(
            "demo",
            Path::new("/repo"),
            &[
                commit(Some("P"), &long, vec![modified("a.py")]),
                commit(Some("P"), &short, vec![modified("a.py")]),
            ],
        );
        assert_eq!(result.records[0].commit_message, format!("{}...", "m".repeat(100)));
        assert_eq!(result.records[1].commit_message, short);
    }

    #[test]
    fn stats_add_up() {
        let provider = ScriptedProvider::default()
            .both("ok.py", "+ok")
            .respond("bad.py", DiffAlgorithm::Myers, Some("+bad"));
        let engine = ComparisonEngine::new(&provider);
        let result = engine.process(
            "demo",
            Path::new("/repo"),
            &[
                commit(None, "root", vec![modified("ok.py")]),
                commit(
                    Some("P"),
                    "m",
                    vec![modified("ok.py"), modified("bad.py"), ModifiedFile::new(None, None)],
                ),
            ],
        );
        assert_eq!(
            result.stats,
            ProcessStats {
                commits_seen: 2,
                root_commits: 1,
                files_without_path: 1,
                files_dropped: 1,
                records: 1,
            }
        );
    }

    #[test]
    fn every_record_honours_discrepancy_invariant() {
        let provider = ScriptedProvider::default()
            .both("a.py", "+same")
            .respond("b.py", DiffAlgorithm::Myers, Some("+one"))
            .respond("b.py", DiffAlgorithm::Histogram, Some("+two"))
            .both("c.md", "");
        let engine = ComparisonEngine::new(&provider);
        let result = engine.process(
            "demo",
            Path::new("/repo"),
            &[commit(
                Some("P"),
                "m",
                vec![modified("a.py"), modified("b.py"), modified("c.md")],
            )],
        );
        assert_eq!(result.records.len(), 3);
        for record in &result.records {
            assert_eq!(
                record.is_discrepancy(),
                record.diff_myers != record.diff_histogram
            );
        }
    }
}

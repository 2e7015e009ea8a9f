//! Dataset aggregation.
//!
//! Every number shown by the console report or the chart comes from here,
//! so both always agree with the dataset. Rates are percentages in
//! `[0, 100]` and a group with no records has rate 0.

use diffduel_core::{ComparisonRecord, FileCategory};
use serde::Serialize;

/// Percentage of `part` in `total`, 0 when `total` is 0.
///
/// # Examples
///
/// ```
/// use diffduel_report::stats::rate;
///
/// assert_eq!(rate(1, 4), 25.0);
/// assert_eq!(rate(0, 0), 0.0);
/// ```
pub fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Totals for one group of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    /// Group label: a repository name or a file category.
    pub label: String,
    /// Records in the group.
    pub total: usize,
    /// Records whose diffs disagree.
    pub discrepancies: usize,
}

impl GroupStats {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            total: 0,
            discrepancies: 0,
        }
    }

    fn add(&mut self, record: &ComparisonRecord) {
        self.total += 1;
        if record.is_discrepancy() {
            self.discrepancies += 1;
        }
    }

    /// Records whose diffs agree.
    pub fn agreements(&self) -> usize {
        self.total - self.discrepancies
    }

    /// Disagreement rate in percent.
    pub fn discrepancy_rate(&self) -> f64 {
        rate(self.discrepancies, self.total)
    }

    /// Agreement rate in percent.
    pub fn agreement_rate(&self) -> f64 {
        rate(self.agreements(), self.total)
    }
}

/// A best or worst group, by disagreement rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extreme {
    /// Group label as displayed.
    pub label: String,
    /// Disagreement rate in percent.
    pub rate: f64,
}

impl Extreme {
    fn of(group: &GroupStats) -> Self {
        Self {
            label: group.label.clone(),
            rate: group.discrepancy_rate(),
        }
    }

    fn not_available() -> Self {
        Self {
            label: "N/A".into(),
            rate: 0.0,
        }
    }
}

/// Lowest and highest disagreement rates per dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extremes {
    /// Repository with the lowest rate.
    pub best_repository: Option<Extreme>,
    /// Repository with the highest rate.
    pub worst_repository: Option<Extreme>,
    /// Eligible file type with the lowest rate, or `N/A`.
    pub best_file_type: Extreme,
    /// Eligible file type with the highest rate, or `N/A`.
    pub worst_file_type: Extreme,
}

/// Aggregated view of a dataset.
///
/// # Examples
///
/// ```
/// use diffduel_core::{ComparisonRecord, FileCategory};
/// use diffduel_report::stats::DatasetStats;
///
/// let records = vec![ComparisonRecord::new(
///     "flask", "c", "p", "m",
///     (Some("a.py".into()), Some("a.py".into())),
///     FileCategory::Source,
///     ("+a".into(), "+b".into()),
/// )];
/// let stats = DatasetStats::from_records(&records);
/// assert_eq!(stats.overall.total, 1);
/// assert_eq!(stats.discrepancy_rate(), 100.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStats {
    /// All records.
    pub overall: GroupStats,
    /// Per repository, in order of first appearance.
    pub repositories: Vec<GroupStats>,
    /// Per file category, in order of first appearance.
    pub file_types: Vec<GroupStats>,
}

impl DatasetStats {
    /// Aggregate `records`.
    pub fn from_records(records: &[ComparisonRecord]) -> Self {
        let mut stats = Self::default();
        stats.add_records(records);
        stats
    }

    /// Fold another batch in, e.g. one repository at a time while streaming.
    pub fn add_records(&mut self, records: &[ComparisonRecord]) {
        for record in records {
            self.overall.add(record);
            group_mut(&mut self.repositories, &record.repository).add(record);
            group_mut(&mut self.file_types, record.file_type.as_str()).add(record);
        }
    }

    /// `true` when there are no records.
    pub fn is_empty(&self) -> bool {
        self.overall.total == 0
    }

    /// Overall agreement rate in percent.
    pub fn agreement_rate(&self) -> f64 {
        self.overall.agreement_rate()
    }

    /// Overall disagreement rate in percent.
    pub fn discrepancy_rate(&self) -> f64 {
        self.overall.discrepancy_rate()
    }

    /// Repositories sorted by name.
    pub fn repositories_alphabetical(&self) -> Vec<&GroupStats> {
        let mut sorted: Vec<&GroupStats> = self.repositories.iter().collect();
        sorted.sort_by(|a, b| a.label.cmp(&b.label));
        sorted
    }

    /// Repositories in `configured` order; any repository not listed
    /// follows alphabetically. Names without records are skipped.
    pub fn repositories_in_order(&self, configured: &[String]) -> Vec<&GroupStats> {
        let mut ordered: Vec<&GroupStats> = configured
            .iter()
            .filter_map(|name| self.repository(name))
            .collect();
        for group in self.repositories_alphabetical() {
            if !configured.contains(&group.label) {
                ordered.push(group);
            }
        }
        ordered
    }

    /// Stats for one repository.
    pub fn repository(&self, name: &str) -> Option<&GroupStats> {
        self.repositories.iter().find(|g| g.label == name)
    }

    /// Stats for one file category.
    pub fn file_type(&self, category: FileCategory) -> Option<&GroupStats> {
        self.file_types.iter().find(|g| g.label == category.as_str())
    }

    /// File types with at least `min_samples` records, in first-appearance order.
    pub fn eligible_file_types(&self, min_samples: usize) -> Vec<&GroupStats> {
        self.file_types
            .iter()
            .filter(|g| g.total >= min_samples)
            .collect()
    }

    /// Eligible file types sorted by rate, ascending and stable.
    pub fn chart_file_types(&self, min_samples: usize) -> Vec<&GroupStats> {
        let mut eligible = self.eligible_file_types(min_samples);
        eligible.sort_by(|a, b| a.discrepancy_rate().total_cmp(&b.discrepancy_rate()));
        eligible
    }

    /// File type with the most discrepancies by count.
    pub fn most_discrepant_file_type(&self) -> Option<&GroupStats> {
        first_max_by(self.file_types.iter(), |g| g.discrepancies as f64)
    }

    /// Repository with the highest rate, scanning alphabetically.
    pub fn highest_rate_repository(&self) -> Option<&GroupStats> {
        first_max_by(self.repositories_alphabetical().into_iter(), |g| {
            g.discrepancy_rate()
        })
    }

    /// Best and worst groups. Repositories are scanned alphabetically, file
    /// types in first-appearance order among eligible ones; ties keep the
    /// first group met.
    pub fn extremes(&self, min_samples: usize) -> Extremes {
        let repositories = self.repositories_alphabetical();
        let eligible = self.eligible_file_types(min_samples);

        let best_repository =
            first_min_by(repositories.iter().copied(), GroupStats::discrepancy_rate);
        let worst_repository =
            first_max_by(repositories.iter().copied(), GroupStats::discrepancy_rate);

        let best_file_type = first_min_by(eligible.iter().copied(), GroupStats::discrepancy_rate);
        let worst_file_type = first_max_by(eligible.iter().copied(), GroupStats::discrepancy_rate);

        Extremes {
            best_repository: best_repository.map(Extreme::of),
            worst_repository: worst_repository.map(Extreme::of),
            best_file_type: best_file_type.map_or_else(Extreme::not_available, Extreme::of),
            worst_file_type: worst_file_type.map_or_else(Extreme::not_available, Extreme::of),
        }
    }
}

impl Default for DatasetStats {
    fn default() -> Self {
        Self {
            overall: GroupStats::new("overall"),
            repositories: Vec::new(),
            file_types: Vec::new(),
        }
    }
}

fn group_mut<'a>(groups: &'a mut Vec<GroupStats>, label: &str) -> &'a mut GroupStats {
    let index = match groups.iter().position(|g| g.label == label) {
        Some(index) => index,
        None => {
            groups.push(GroupStats::new(label));
            groups.len() - 1
        }
    };
    &mut groups[index]
}

fn first_max_by<'a, I, F>(groups: I, key: F) -> Option<&'a GroupStats>
where
    I: Iterator<Item = &'a GroupStats>,
    F: Fn(&GroupStats) -> f64,
{
    groups.fold(None, |best, group| match best {
        Some(current) if key(group) <= key(current) => Some(current),
        _ => Some(group),
    })
}

fn first_min_by<'a, I, F>(groups: I, key: F) -> Option<&'a GroupStats>
where
    I: Iterator<Item = &'a GroupStats>,
    F: Fn(&GroupStats) -> f64,
{
    groups.fold(None, |best, group| match best {
        Some(current) if key(group) >= key(current) => Some(current),
        _ => Some(group),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(repository: &str, category: FileCategory, disagree: bool) -> ComparisonRecord {
        let histogram = if disagree { "+b" } else { "+a" };
        ComparisonRecord::new(
            repository,
            "c",
            "p",
            "m",
            (Some("f".into()), Some("f".into())),
            category,
            ("+a".into(), histogram.into()),
        )
    }

    /// `n` records, the first `bad` of which disagree.
    pub(crate) fn batch(
        repository: &str,
        category: FileCategory,
        n: usize,
        bad: usize,
    ) -> Vec<ComparisonRecord> {
        (0..n).map(|i| record(repository, category, i < bad)).collect()
    }

    #[test]
    fn three_repository_totals() {
        let mut records = batch("flask", FileCategory::Source, 100, 4);
        records.extend(batch("fastapi", FileCategory::Source, 200, 8));
        records.extend(batch("requests", FileCategory::Source, 50, 2));
        let stats = DatasetStats::from_records(&records);

        assert_eq!(stats.overall.total, 350);
        assert_eq!(stats.overall.discrepancies, 14);
        assert_eq!(format!("{:.2}", stats.discrepancy_rate()), "4.00");
        assert_eq!(format!("{:.2}", stats.agreement_rate()), "96.00");
        for group in &stats.repositories {
            assert_eq!(group.discrepancy_rate(), 4.0, "{}", group.label);
        }
    }

    #[test]
    fn empty_dataset_has_zero_rates() {
        let stats = DatasetStats::from_records(&[]);
        assert!(stats.is_empty());
        assert_eq!(stats.discrepancy_rate(), 0.0);
        assert_eq!(stats.agreement_rate(), 0.0);
        assert!(stats.repositories.is_empty());
        let extremes = stats.extremes(10);
        assert_eq!(extremes.best_repository, None);
        assert_eq!(extremes.worst_file_type.label, "N/A");
        assert_eq!(extremes.worst_file_type.rate, 0.0);
    }

    #[test]
    fn rates_stay_in_range() {
        let mut records = batch("a", FileCategory::Web, 3, 3);
        records.extend(batch("b", FileCategory::Config, 3, 0));
        let stats = DatasetStats::from_records(&records);
        for group in stats.repositories.iter().chain(&stats.file_types) {
            let r = group.discrepancy_rate();
            assert!((0.0..=100.0).contains(&r));
            assert_eq!(group.agreements() + group.discrepancies, group.total);
        }
    }

    #[test]
    fn file_types_keep_first_appearance_order() {
        let records = vec![
            record("r", FileCategory::Documentation, false),
            record("r", FileCategory::Source, true),
            record("r", FileCategory::Documentation, false),
            record("r", FileCategory::Test, false),
        ];
        let stats = DatasetStats::from_records(&records);
        let labels: Vec<&str> = stats.file_types.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Documentation", "Source", "Test"]);
        assert_eq!(stats.file_type(FileCategory::Documentation).unwrap().total, 2);
        assert!(stats.file_type(FileCategory::Web).is_none());
    }

    #[test]
    fn small_categories_are_excluded_from_chart() {
        let mut records = batch("r", FileCategory::Source, 500, 20);
        records.extend(batch("r", FileCategory::Web, 9, 5));
        let stats = DatasetStats::from_records(&records);

        let chart: Vec<&str> = stats
            .chart_file_types(10)
            .iter()
            .map(|g| g.label.as_str())
            .collect();
        assert_eq!(chart, vec!["Source"]);
        // The console breakdown still lists every category.
        assert_eq!(stats.file_types.len(), 2);
    }

    #[test]
    fn chart_file_types_sorted_by_rate_ascending() {
        let mut records = batch("r", FileCategory::Source, 10, 5);
        records.extend(batch("r", FileCategory::Documentation, 10, 0));
        records.extend(batch("r", FileCategory::Config, 10, 2));
        let stats = DatasetStats::from_records(&records);

        let chart: Vec<&str> = stats
            .chart_file_types(10)
            .iter()
            .map(|g| g.label.as_str())
            .collect();
        assert_eq!(chart, vec!["Documentation", "Config", "Source"]);
    }

    #[test]
    fn no_eligible_file_type_reports_not_available() {
        let records = batch("r", FileCategory::Source, 5, 1);
        let stats = DatasetStats::from_records(&records);
        let extremes = stats.extremes(10);
        assert_eq!(extremes.best_file_type, Extreme::not_available());
        assert_eq!(extremes.worst_file_type, Extreme::not_available());
        assert!(extremes.best_repository.is_some());
    }

    #[test]
    fn extremes_keep_first_on_ties() {
        let mut records = batch("zeta", FileCategory::Source, 10, 1);
        records.extend(batch("alpha", FileCategory::Config, 10, 1));
        records.extend(batch("mid", FileCategory::Web, 10, 5));
        let stats = DatasetStats::from_records(&records);
        let extremes = stats.extremes(10);

        // alpha and zeta tie at 10%; alpha comes first alphabetically.
        assert_eq!(extremes.best_repository.unwrap().label, "alpha");
        assert_eq!(extremes.worst_repository.unwrap().label, "mid");
        // Source and Config tie; Source appeared first.
        assert_eq!(extremes.best_file_type.label, "Source");
        assert_eq!(extremes.worst_file_type.label, "Web");
        assert_eq!(extremes.worst_file_type.rate, 50.0);
    }

    #[test]
    fn repository_orders() {
        let mut records = batch("requests", FileCategory::Source, 1, 0);
        records.extend(batch("flask", FileCategory::Source, 1, 0));
        records.extend(batch("fastapi", FileCategory::Source, 1, 0));
        let stats = DatasetStats::from_records(&records);

        let alpha: Vec<&str> = stats
            .repositories_alphabetical()
            .iter()
            .map(|g| g.label.as_str())
            .collect();
        assert_eq!(alpha, vec!["fastapi", "flask", "requests"]);

        let configured = vec!["flask".to_string(), "ghost".to_string(), "requests".to_string()];
        let ordered: Vec<&str> = stats
            .repositories_in_order(&configured)
            .iter()
            .map(|g| g.label.as_str())
            .collect();
        assert_eq!(ordered, vec!["flask", "requests", "fastapi"]);
    }

    #[test]
    fn batches_fold_like_a_single_pass() {
        let first = batch("flask", FileCategory::Source, 10, 3);
        let second = batch("fastapi", FileCategory::Web, 5, 1);
        let mut streamed = DatasetStats::default();
        streamed.add_records(&first);
        streamed.add_records(&second);

        let all: Vec<ComparisonRecord> = first.into_iter().chain(second).collect();
        assert_eq!(streamed, DatasetStats::from_records(&all));
    }

    #[test]
    fn breakdowns_sum_to_overall_totals() {
        let mut records = Vec::new();
        for (i, repository) in ["flask", "fastapi", "requests"].iter().enumerate() {
            records.extend(batch(repository, FileCategory::Source, 40 + i, 3 + i));
            records.extend(batch(repository, FileCategory::Documentation, 7, i));
            records.extend(batch(repository, FileCategory::Config, 3 * i, i));
            records.extend(batch(repository, FileCategory::Unknown, 2, 1));
        }
        let stats = DatasetStats::from_records(&records);
        assert_eq!(stats.overall.total, records.len());

        let repo_total: usize = stats.repositories.iter().map(|g| g.total).sum();
        let repo_bad: usize = stats.repositories.iter().map(|g| g.discrepancies).sum();
        let type_total: usize = stats.file_types.iter().map(|g| g.total).sum();
        let type_bad: usize = stats.file_types.iter().map(|g| g.discrepancies).sum();

        assert_eq!(repo_total, stats.overall.total);
        assert_eq!(type_total, stats.overall.total);
        assert_eq!(repo_bad, stats.overall.discrepancies);
        assert_eq!(type_bad, stats.overall.discrepancies);
        assert_eq!(
            stats.overall.agreements() + stats.overall.discrepancies,
            stats.overall.total
        );
    }

    #[test]
    fn most_discrepant_file_type_counts_discrepancies() {
        let mut records = batch("r", FileCategory::Documentation, 2, 2);
        records.extend(batch("r", FileCategory::Source, 100, 5));
        let stats = DatasetStats::from_records(&records);
        assert_eq!(stats.most_discrepant_file_type().unwrap().label, "Source");
        assert_eq!(stats.highest_rate_repository().unwrap().label, "r");
    }
}

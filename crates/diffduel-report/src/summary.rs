//! Console summary of a dataset.
//!
//! [`Summary`] is rendered as plain text through `Display` (or
//! [`Summary::render_text`] for ANSI colour), as Markdown through
//! [`Summary::to_markdown`] and as JSON through [`Summary::to_json`].

use std::fmt;

use diffduel_core::{DuelError, FileCategory};
use serde::Serialize;

use crate::stats::{DatasetStats, Extremes, GroupStats};

/// Presentation choices for a [`Summary`].
#[derive(Debug, Clone)]
pub struct SummaryOptions {
    /// Configured repository order; empty means alphabetical.
    pub repository_order: Vec<String>,
    /// Commit cap the dataset was produced with, if known.
    pub max_commits: Option<usize>,
    /// Minimum records for a file type to count in extremal statistics.
    pub min_samples: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            repository_order: Vec::new(),
            max_commits: None,
            min_samples: 10,
        }
    }
}

/// One line of a breakdown table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRow {
    /// Repository name or file category.
    pub label: String,
    /// Records in the group.
    pub total: usize,
    /// Records whose diffs disagree.
    pub discrepancies: usize,
    /// Disagreement rate in percent.
    pub rate: f64,
}

impl From<&GroupStats> for BreakdownRow {
    fn from(group: &GroupStats) -> Self {
        Self {
            label: group.label.clone(),
            total: group.total,
            discrepancies: group.discrepancies,
            rate: group.discrepancy_rate(),
        }
    }
}

/// Everything the console report shows.
///
/// # Examples
///
/// ```
/// use diffduel_core::{ComparisonRecord, FileCategory};
/// use diffduel_report::stats::DatasetStats;
/// use diffduel_report::summary::{Summary, SummaryOptions};
///
/// let records = vec![ComparisonRecord::new(
///     "flask", "c", "p", "m",
///     (None, Some("README.md".into())),
///     FileCategory::Documentation,
///     ("+x".into(), "+x".into()),
/// )];
/// let summary = Summary::new(&DatasetStats::from_records(&records), &SummaryOptions::default());
/// assert!(summary.to_string().contains("Total file modifications analyzed: 1"));
/// assert!(summary.to_markdown().contains("| flask | 0 | 1 | 0.0% |"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Records in the dataset.
    pub total_files: usize,
    /// Records whose diffs disagree.
    pub total_discrepancies: usize,
    /// Overall agreement rate in percent.
    pub agreement_rate: f64,
    /// Overall disagreement rate in percent.
    pub discrepancy_rate: f64,
    /// Per-repository breakdown.
    pub repositories: Vec<BreakdownRow>,
    /// Per-file-type breakdown, every category regardless of size, by label.
    pub file_types: Vec<BreakdownRow>,
    /// Best and worst groups.
    pub extremes: Extremes,
    /// Derived observations, one sentence each.
    pub insights: Vec<String>,
}

impl Summary {
    /// Build the summary for `stats`.
    pub fn new(stats: &DatasetStats, options: &SummaryOptions) -> Self {
        let repositories = if options.repository_order.is_empty() {
            stats.repositories_alphabetical()
        } else {
            stats.repositories_in_order(&options.repository_order)
        };

        Self {
            total_files: stats.overall.total,
            total_discrepancies: stats.overall.discrepancies,
            agreement_rate: stats.agreement_rate(),
            discrepancy_rate: stats.discrepancy_rate(),
            repositories: repositories.into_iter().map(BreakdownRow::from).collect(),
            file_types: file_types_alphabetical(stats),
            extremes: stats.extremes(options.min_samples),
            insights: insights(stats, options),
        }
    }

    /// Render the text report, with ANSI colour when `color` is set.
    pub fn render_text(&self, color: bool) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_text(&mut out, color);
        out
    }

    fn write_text(&self, f: &mut impl fmt::Write, color: bool) -> fmt::Result {
        let heading = |text: &str| paint(text, "\x1b[1;36m", color);
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "{}", paint("DIFF ALGORITHM ANALYSIS SUMMARY", "\x1b[1m", color))?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\n{}", heading("OVERALL RESULTS:"))?;
        writeln!(f, "   Total file modifications analyzed: {}", self.total_files)?;
        writeln!(f, "   Total discrepancies found: {}", self.total_discrepancies)?;
        writeln!(f, "   Overall agreement rate: {:.2}%", self.agreement_rate)?;
        writeln!(f, "   Overall discrepancy rate: {:.2}%", self.discrepancy_rate)?;

        writeln!(f, "\n{}", heading("REPOSITORY BREAKDOWN:"))?;
        for row in &self.repositories {
            writeln!(
                f,
                "   {}: {}/{} files ({})",
                row.label,
                row.discrepancies,
                row.total,
                rate_cell(row, color)
            )?;
        }

        writeln!(f, "\n{}", heading("FILE TYPE ANALYSIS:"))?;
        for row in &self.file_types {
            writeln!(
                f,
                "   {}: {}/{} ({})",
                row.label,
                row.discrepancies,
                row.total,
                rate_cell(row, color)
            )?;
        }

        if !self.insights.is_empty() {
            writeln!(f, "\n{}", heading("KEY INSIGHTS:"))?;
            for insight in &self.insights {
                writeln!(f, "   - {insight}")?;
            }
        }

        write!(f, "{rule}")
    }

    /// Render as pretty-printed JSON with camelCase keys.
    pub fn to_json(&self) -> Result<String, DuelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as GitHub-flavored Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Diff Algorithm Analysis Summary\n\n");
        out.push_str(&format!(
            "**Files analyzed:** {}  \n**Discrepancies:** {}  \n**Agreement rate:** {:.2}%  \n**Discrepancy rate:** {:.2}%\n\n",
            self.total_files, self.total_discrepancies, self.agreement_rate, self.discrepancy_rate
        ));

        for (title, heading, rows) in [
            ("Repositories", "Repository", &self.repositories),
            ("File Types", "File type", &self.file_types),
        ] {
            out.push_str(&format!("## {title}\n\n"));
            if rows.is_empty() {
                out.push_str("No records.\n\n");
                continue;
            }
            out.push_str(&format!("| {heading} | Discrepancies | Files | Rate |\n"));
            out.push_str("|---|---|---|---|\n");
            for row in rows {
                out.push_str(&format!(
                    "| {} | {} | {} | {:.1}% |\n",
                    row.label, row.discrepancies, row.total, row.rate
                ));
            }
            out.push('\n');
        }

        if !self.insights.is_empty() {
            out.push_str("## Key Insights\n\n");
            for insight in &self.insights {
                out.push_str(&format!("- {insight}\n"));
            }
        }
        out
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f, false)
    }
}

fn file_types_alphabetical(stats: &DatasetStats) -> Vec<BreakdownRow> {
    let mut rows: Vec<BreakdownRow> = stats.file_types.iter().map(BreakdownRow::from).collect();
    rows.sort_by(|a, b| a.label.cmp(&b.label));
    rows
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("{code}{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

/// Green when both algorithms always agreed, yellow otherwise.
fn rate_cell(row: &BreakdownRow, color: bool) -> String {
    let code = if row.discrepancies == 0 {
        "\x1b[32m"
    } else {
        "\x1b[33m"
    };
    paint(&format!("{:.1}%", row.rate), code, color)
}

fn insights(stats: &DatasetStats, options: &SummaryOptions) -> Vec<String> {
    let mut out = Vec::new();
    if stats.is_empty() {
        return out;
    }

    if let Some(group) = stats.most_discrepant_file_type() {
        out.push(format!(
            "{} files had the most discrepancies ({} total)",
            group.label, group.discrepancies
        ));
    }

    if let Some(group) = stats.highest_rate_repository() {
        out.push(format!(
            "{} showed the highest discrepancy rate ({:.1}%)",
            group.label,
            group.discrepancy_rate()
        ));
    }

    match stats.file_type(FileCategory::Documentation) {
        Some(docs) if docs.discrepancies == 0 => {
            out.push("Documentation files showed perfect agreement between algorithms".into());
        }
        Some(docs) => out.push(format!(
            "Documentation files had {} discrepancies",
            docs.discrepancies
        )),
        None => {}
    }

    let extremes = stats.extremes(options.min_samples);
    out.push(format!(
        "Most problematic file type: {} ({:.2}% disagreement)",
        extremes.worst_file_type.label, extremes.worst_file_type.rate
    ));
    if let Some(best) = &extremes.best_repository {
        out.push(format!(
            "Repository with best agreement: {} ({:.2}% disagreement)",
            best.label, best.rate
        ));
    }

    if let Some(cap) = options.max_commits {
        out.push(format!("Analysis processed up to {cap} commits per repository"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::batch;

    fn sample() -> DatasetStats {
        let mut records = batch("flask", FileCategory::Source, 100, 4);
        records.extend(batch("fastapi", FileCategory::Documentation, 20, 0));
        records.extend(batch("requests", FileCategory::Source, 50, 10));
        DatasetStats::from_records(&records)
    }

    #[test]
    fn text_report_shows_totals_and_breakdowns() {
        let summary = Summary::new(&sample(), &SummaryOptions::default());
        let text = summary.to_string();

        assert!(text.contains("Total file modifications analyzed: 170"));
        assert!(text.contains("Total discrepancies found: 14"));
        assert!(text.contains("Overall discrepancy rate: 8.24%"));
        assert!(text.contains("flask: 4/100 files (4.0%)"));
        assert!(text.contains("Source: 14/150 (9.3%)"));
        assert!(text.contains("Documentation: 0/20 (0.0%)"));
    }

    #[test]
    fn repositories_alphabetical_without_configured_order() {
        let summary = Summary::new(&sample(), &SummaryOptions::default());
        let labels: Vec<&str> = summary.repositories.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["fastapi", "flask", "requests"]);
    }

    #[test]
    fn configured_order_is_respected() {
        let options = SummaryOptions {
            repository_order: vec!["requests".into(), "flask".into(), "fastapi".into()],
            ..SummaryOptions::default()
        };
        let summary = Summary::new(&sample(), &options);
        let labels: Vec<&str> = summary.repositories.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["requests", "flask", "fastapi"]);
    }

    #[test]
    fn insights_are_derived_from_data() {
        let options = SummaryOptions {
            max_commits: Some(1000),
            ..SummaryOptions::default()
        };
        let summary = Summary::new(&sample(), &options);
        let insights = summary.insights.join("\n");

        assert!(insights.contains("Source files had the most discrepancies (14 total)"));
        assert!(insights.contains("requests showed the highest discrepancy rate (20.0%)"));
        assert!(insights.contains("Documentation files showed perfect agreement"));
        assert!(insights.contains("up to 1000 commits per repository"));
    }

    #[test]
    fn documentation_discrepancies_are_counted() {
        let records = batch("r", FileCategory::Documentation, 5, 2);
        let summary = Summary::new(&DatasetStats::from_records(&records), &SummaryOptions::default());
        assert!(summary
            .insights
            .iter()
            .any(|i| i == "Documentation files had 2 discrepancies"));
    }

    #[test]
    fn empty_stats_render_without_panicking() {
        let summary = Summary::new(&DatasetStats::from_records(&[]), &SummaryOptions::default());
        assert!(summary.to_string().contains("Overall discrepancy rate: 0.00%"));
        assert!(summary.insights.is_empty());
        assert!(summary.to_markdown().contains("No records."));
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let summary = Summary::new(&sample(), &SummaryOptions::default());
        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(value["totalFiles"], 170);
        assert_eq!(value["totalDiscrepancies"], 14);
        assert_eq!(value["repositories"][0]["label"], "fastapi");
        assert_eq!(value["extremes"]["worstFileType"]["label"], "Source");
    }

    #[test]
    fn file_types_listed_alphabetically() {
        let mut records = batch("r", FileCategory::Web, 3, 0);
        records.extend(batch("r", FileCategory::Config, 2, 1));
        records.extend(batch("r", FileCategory::Documentation, 1, 0));
        let summary = Summary::new(&DatasetStats::from_records(&records), &SummaryOptions::default());
        let labels: Vec<&str> = summary.file_types.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Config", "Documentation", "Web"]);
    }

    #[test]
    fn colored_text_matches_plain_text_once_escapes_are_stripped() {
        let summary = Summary::new(&sample(), &SummaryOptions::default());
        let plain = summary.render_text(false);
        let colored = summary.render_text(true);

        assert_eq!(plain, summary.to_string());
        assert!(!plain.contains('\x1b'));
        assert!(colored.contains("\x1b[1;36mOVERALL RESULTS:\x1b[0m"));
        assert!(colored.contains("fastapi: 0/20 files (\x1b[32m0.0%\x1b[0m)"));
        assert!(colored.contains("flask: 4/100 files (\x1b[33m4.0%\x1b[0m)"));

        let mut stripped = String::new();
        let mut chars = colored.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                stripped.push(c);
            }
        }
        assert_eq!(stripped, plain);
    }

    #[test]
    fn markdown_has_tables() {
        let summary = Summary::new(&sample(), &SummaryOptions::default());
        let md = summary.to_markdown();
        assert!(md.starts_with("# Diff Algorithm Analysis Summary"));
        assert!(md.contains("| Repository | Discrepancies | Files | Rate |"));
        assert!(md.contains("| requests | 10 | 50 | 20.0% |"));
        assert!(md.contains("## Key Insights"));
    }
}

//! Four-panel PNG chart.
//!
//! Layout is a 2x2 grid: (a) agreement vs disagreement proportions,
//! (b) disagreement rate per repository, (c) disagreement rate per eligible
//! file type, (d) a text panel with totals and extremal statistics.
//! [`ChartData`] holds every number drawn, so it can be checked without
//! rendering.

use std::fmt;
use std::path::Path;

use diffduel_core::DuelError;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;

use crate::stats::{rate, DatasetStats, GroupStats};

const AGREEMENT: RGBColor = RGBColor(0x70, 0x80, 0x90);
const DISAGREEMENT: RGBColor = RGBColor(0xB2, 0x22, 0x22);
const BAR: RGBColor = RGBColor(0x69, 0x69, 0x69);
const FONT: &str = "sans-serif";

/// One bar of a rate chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    /// Upper-cased label.
    pub label: String,
    /// Disagreement rate in percent.
    pub rate: f64,
    /// Records whose diffs disagree.
    pub discrepancies: usize,
    /// Records in the group.
    pub total: usize,
}

impl From<&GroupStats> for Bar {
    fn from(group: &GroupStats) -> Self {
        Self {
            label: group.label.to_uppercase(),
            rate: group.discrepancy_rate(),
            discrepancies: group.discrepancies,
            total: group.total,
        }
    }
}

/// Numbers drawn by [`render_chart`].
///
/// # Examples
///
/// ```
/// use diffduel_core::{ComparisonRecord, FileCategory};
/// use diffduel_report::chart::ChartData;
/// use diffduel_report::stats::DatasetStats;
///
/// let records = vec![ComparisonRecord::new(
///     "flask", "c", "p", "m",
///     (Some("a.py".into()), Some("a.py".into())),
///     FileCategory::Source,
///     ("+a".into(), "+a".into()),
/// )];
/// let data = ChartData::from_stats(&DatasetStats::from_records(&records), 10);
/// assert_eq!(data.agreements, 1);
/// assert_eq!(data.repositories[0].label, "FLASK");
/// assert!(data.file_types.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    /// Records whose diffs agree.
    pub agreements: usize,
    /// Records whose diffs disagree.
    pub disagreements: usize,
    /// Per repository, alphabetical.
    pub repositories: Vec<Bar>,
    /// Eligible file types, by rate ascending.
    pub file_types: Vec<Bar>,
    /// Minimum records for a file type to be drawn.
    pub min_samples: usize,
    /// Lines of the summary panel.
    pub summary_lines: Vec<String>,
}

impl ChartData {
    /// Collect chart numbers from `stats`.
    pub fn from_stats(stats: &DatasetStats, min_samples: usize) -> Self {
        let extremes = stats.extremes(min_samples);
        let upper = |label: &str| label.to_uppercase();

        let mut summary_lines = vec![
            "Analysis Results Summary".to_string(),
            String::new(),
            "Dataset Overview:".to_string(),
            format!("  Total Files Analyzed: {}", stats.overall.total),
            format!("  Algorithm Disagreements: {}", stats.overall.discrepancies),
            format!("  Overall Agreement Rate: {:.2}%", stats.agreement_rate()),
            format!("  Overall Disagreement Rate: {:.2}%", stats.discrepancy_rate()),
            String::new(),
            "Repository Performance:".to_string(),
        ];
        if let (Some(best), Some(worst)) = (&extremes.best_repository, &extremes.worst_repository) {
            summary_lines.push(format!(
                "  Best Agreement: {} ({:.2}% disagreement)",
                upper(&best.label),
                best.rate
            ));
            summary_lines.push(format!(
                "  Most Disagreements: {} ({:.2}% disagreement)",
                upper(&worst.label),
                worst.rate
            ));
        }
        summary_lines.extend([
            String::new(),
            "File Type Analysis:".to_string(),
            format!(
                "  Most Problematic: {} ({:.2}% disagreement)",
                upper(&extremes.worst_file_type.label),
                extremes.worst_file_type.rate
            ),
            format!(
                "  Most Reliable: {} ({:.2}% disagreement)",
                upper(&extremes.best_file_type.label),
                extremes.best_file_type.rate
            ),
            String::new(),
            format!(
                "{:.1}% of files show identical diff outputs",
                stats.agreement_rate()
            ),
        ]);

        Self {
            agreements: stats.overall.agreements(),
            disagreements: stats.overall.discrepancies,
            repositories: stats
                .repositories_alphabetical()
                .into_iter()
                .map(Bar::from)
                .collect(),
            file_types: stats
                .chart_file_types(min_samples)
                .into_iter()
                .map(Bar::from)
                .collect(),
            min_samples,
            summary_lines,
        }
    }

    fn total(&self) -> usize {
        self.agreements + self.disagreements
    }

    /// Agreement share in percent.
    pub fn agreement_pct(&self) -> f64 {
        rate(self.agreements, self.total())
    }

    /// Disagreement share in percent.
    pub fn disagreement_pct(&self) -> f64 {
        rate(self.disagreements, self.total())
    }
}

fn chart_err<E: fmt::Display>(e: E) -> DuelError {
    DuelError::Chart(e.to_string())
}

/// Upper bound of a rate axis, never zero.
fn axis_max(rates: impl Iterator<Item = f64>, headroom: f64) -> f64 {
    let max = rates.fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * headroom
    } else {
        1.0
    }
}

/// Render `data` as a PNG at `path`.
///
/// # Errors
///
/// Returns [`DuelError::Chart`] if the image cannot be drawn or written.
pub fn render_chart(data: &ChartData, path: &Path, width: u32, height: u32) -> Result<(), DuelError> {
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;
    let root = root
        .titled(
            "Git Diff Algorithm Comparison: Myers vs Histogram",
            (FONT, 48).into_font().style(FontStyle::Bold),
        )
        .map_err(chart_err)?;

    let panels = root.split_evenly((2, 2));
    draw_agreement(&panels[0], data)?;
    draw_repositories(&panels[1], &data.repositories)?;
    draw_file_types(&panels[2], &data.file_types, data.min_samples)?;
    draw_summary(&panels[3], &data.summary_lines)?;

    root.present().map_err(chart_err)?;
    tracing::info!(path = %path.display(), "chart written");
    Ok(())
}

fn draw_agreement(area: &DrawingArea<BitMapBackend, Shift>, data: &ChartData) -> Result<(), DuelError> {
    let mut chart = ChartBuilder::on(area)
        .caption("Algorithm Agreement Distribution", (FONT, 32))
        .margin(40)
        .x_label_area_size(60)
        .build_cartesian_2d(0f64..100f64, 0f64..1f64)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .disable_y_axis()
        .x_desc("Share of files (%)")
        .label_style((FONT, 20))
        .axis_desc_style((FONT, 22))
        .draw()
        .map_err(chart_err)?;

    let agree = data.agreement_pct();
    chart
        .draw_series([
            Rectangle::new([(0.0, 0.25), (agree, 0.75)], AGREEMENT.filled()),
            Rectangle::new([(agree, 0.25), (100.0, 0.75)], DISAGREEMENT.filled()),
        ])
        .map_err(chart_err)?;

    let style = (FONT, 22).into_font();
    let labels = if data.disagreements == 0 {
        vec![(
            format!("Perfect Agreement: {} files (100.0%)", data.agreements),
            0.85,
        )]
    } else {
        vec![
            (
                format!("Agreement: {} files ({:.1}%)", data.agreements, agree),
                0.85,
            ),
            (
                format!(
                    "Disagreement: {} files ({:.1}%)",
                    data.disagreements,
                    data.disagreement_pct()
                ),
                0.12,
            ),
        ]
    };
    chart
        .draw_series(
            labels
                .into_iter()
                .map(|(text, y)| Text::new(text, (2.0, y), style.clone())),
        )
        .map_err(chart_err)?;
    Ok(())
}

fn draw_repositories(area: &DrawingArea<BitMapBackend, Shift>, bars: &[Bar]) -> Result<(), DuelError> {
    let count = bars.len().max(1) as u32;
    let y_max = axis_max(bars.iter().map(|b| b.rate), 1.2);

    let mut chart = ChartBuilder::on(area)
        .caption("Disagreement Rate by Repository", (FONT, 32))
        .margin(40)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d((0u32..count).into_segmented(), 0f64..y_max)
        .map_err(chart_err)?;

    let label_of = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(i) => bars
            .get(*i as usize)
            .map(|b| b.label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Repository")
        .y_desc("Disagreement Rate (%)")
        .x_label_formatter(&label_of)
        .label_style((FONT, 20))
        .axis_desc_style((FONT, 22))
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BAR.filled())
                .margin(30)
                .data(bars.iter().enumerate().map(|(i, b)| (i as u32, b.rate))),
        )
        .map_err(chart_err)?;

    let style = (FONT, 20).into_font();
    chart
        .draw_series(bars.iter().enumerate().map(|(i, b)| {
            Text::new(
                format!("{:.2}% ({} of {})", b.rate, b.discrepancies, b.total),
                (SegmentValue::CenterOf(i as u32), b.rate + y_max * 0.02),
                style.clone(),
            )
        }))
        .map_err(chart_err)?;
    Ok(())
}

fn draw_file_types(
    area: &DrawingArea<BitMapBackend, Shift>,
    bars: &[Bar],
    min_samples: usize,
) -> Result<(), DuelError> {
    if bars.is_empty() {
        area.draw(&Text::new(
            format!("No file type has at least {min_samples} records"),
            (60, 80),
            (FONT, 24).into_font(),
        ))
        .map_err(chart_err)?;
        return Ok(());
    }

    let count = bars.len() as u32;
    let x_max = axis_max(bars.iter().map(|b| b.rate), 1.3);

    let mut chart = ChartBuilder::on(area)
        .caption("Disagreement Rate by File Type", (FONT, 32))
        .margin(40)
        .x_label_area_size(60)
        .y_label_area_size(180)
        .build_cartesian_2d(0f64..x_max, (0u32..count).into_segmented())
        .map_err(chart_err)?;

    let label_of = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(i) => bars
            .get(*i as usize)
            .map(|b| b.label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Disagreement Rate (%)")
        .y_desc("File Type")
        .y_label_formatter(&label_of)
        .label_style((FONT, 20))
        .axis_desc_style((FONT, 22))
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            Histogram::horizontal(&chart)
                .style(BAR.filled())
                .margin(20)
                .data(bars.iter().enumerate().map(|(i, b)| (i as u32, b.rate))),
        )
        .map_err(chart_err)?;

    let style = (FONT, 20).into_font();
    chart
        .draw_series(bars.iter().enumerate().map(|(i, b)| {
            Text::new(
                format!("{:.2}% ({}/{})", b.rate, b.discrepancies, b.total),
                (b.rate + x_max * 0.02, SegmentValue::CenterOf(i as u32)),
                style.clone(),
            )
        }))
        .map_err(chart_err)?;
    Ok(())
}

fn draw_summary(area: &DrawingArea<BitMapBackend, Shift>, lines: &[String]) -> Result<(), DuelError> {
    let style = (FONT, 24).into_font();
    for (i, line) in lines.iter().enumerate() {
        area.draw(&Text::new(line.as_str(), (60, 60 + i as i32 * 34), style.clone()))
            .map_err(chart_err)?;
    }
    Ok(())
}

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use diffduel_compare::dataset::{count_records, read_dataset, DatasetWriter};
use diffduel_compare::engine::ProcessStats;
use diffduel_compare::pipeline::{analyze_repository, RepositoryStatus};
use diffduel_core::{DuelConfig, OutputFormat, RepositorySpec};
use diffduel_history::invoker::GitCli;
use diffduel_history::mining::TraversalOptions;
use diffduel_report::chart::{render_chart, ChartData};
use diffduel_report::stats::DatasetStats;
use diffduel_report::summary::{Summary, SummaryOptions};

const CONFIG_FILE: &str = ".diffduel.toml";

#[derive(Parser)]
#[command(
    name = "diffduel",
    version,
    about = "Compare Myers and Histogram diffs across git history",
    long_about = "diffduel walks the history of one or more git repositories, diffs every\n\
                   modified file twice (Myers and Histogram) and records whether the two\n\
                   outputs are identical. Results land in a CSV dataset that the summary\n\
                   and chart commands report on.\n\n\
                   Examples:\n  \
                     diffduel init                            Create a .diffduel.toml config file\n  \
                     diffduel analyze --repo flask=../flask   Analyze one repository\n  \
                     diffduel summary                         Print statistics for dataset.csv\n  \
                     diffduel chart --output Figure_1.png     Render the four-panel chart\n  \
                     diffduel doctor                          Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .diffduel.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output (debug logging)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Mine repositories and write the comparison dataset
    #[command(long_about = "Mine repositories and write the comparison dataset.\n\n\
        For every commit with a parent, each modified file is diffed with Myers and\n\
        with Histogram (ignoring whitespace and blank lines). Files for which either\n\
        diff fails are dropped. Records are appended to the dataset per repository.\n\n\
        Examples:\n  diffduel analyze\n  diffduel analyze --repo fastapi=../fastapi --repo flask=../flask\n  diffduel analyze --max-commits 200 --output small.csv")]
    Analyze {
        /// Repository to analyze as NAME=PATH (repeatable, replaces configured list)
        #[arg(long = "repo", value_name = "NAME=PATH")]
        repos: Vec<RepositorySpec>,

        /// Maximum commits per repository (default: 1000)
        #[arg(long)]
        max_commits: Option<usize>,

        /// Dataset file to write (default: dataset.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print statistics for an existing dataset
    #[command(long_about = "Print statistics for an existing dataset.\n\n\
        Shows overall agreement, per-repository and per-file-type breakdowns,\n\
        and derived insights.\n\n\
        Examples:\n  diffduel summary\n  diffduel summary --dataset runs/dataset.csv --format json")]
    Summary {
        /// Dataset file to read (default: dataset.csv)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Render the four-panel chart for an existing dataset
    #[command(long_about = "Render the four-panel chart for an existing dataset.\n\n\
        Panels: agreement distribution, disagreement rate per repository,\n\
        disagreement rate per file type (categories with enough samples only),\n\
        and a text summary with extremal statistics.\n\n\
        Examples:\n  diffduel chart\n  diffduel chart --output report.png --min-samples 25")]
    Chart {
        /// Dataset file to read (default: dataset.csv)
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// PNG file to write (default: Figure_1.png)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Minimum records for a file type to be charted (default: 10)
        #[arg(long)]
        min_samples: Option<usize>,
    },
    /// Create a default .diffduel.toml configuration file
    #[command(long_about = "Create a default .diffduel.toml configuration file.\n\n\
        Generates a template with every option at its default value.\n\
        Fails if .diffduel.toml already exists.")]
    Init,
    /// Check your diffduel setup and environment
    #[command(long_about = "Check your diffduel setup and environment.\n\n\
        Runs diagnostics for the git executable, the config file, each configured\n\
        repository and the dataset. Use --format json for machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mdiffduel\x1b[0m v{version}: Myers vs Histogram, commit by commit\n");

        println!("Quick start:");
        println!("  \x1b[36mdiffduel init\x1b[0m        Create a .diffduel.toml config file");
        println!("  \x1b[36mdiffduel analyze\x1b[0m     Build dataset.csv from the configured repositories");
        println!("  \x1b[36mdiffduel summary\x1b[0m     Print statistics for the dataset\n");

        println!("All commands:");
        println!("  \x1b[32manalyze\x1b[0m   Mine history and diff every modified file twice");
        println!("  \x1b[32msummary\x1b[0m   Totals, breakdowns and insights");
        println!("  \x1b[32mchart\x1b[0m     Four-panel PNG chart");
        println!("  \x1b[32mdoctor\x1b[0m    Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("diffduel v{version}: Myers vs Histogram, commit by commit\n");

        println!("Quick start:");
        println!("  diffduel init        Create a .diffduel.toml config file");
        println!("  diffduel analyze     Build dataset.csv from the configured repositories");
        println!("  diffduel summary     Print statistics for the dataset\n");

        println!("All commands:");
        println!("  analyze   Mine history and diff every modified file twice");
        println!("  summary   Totals, breakdowns and insights");
        println!("  chart     Four-panel PNG chart");
        println!("  doctor    Check your setup and environment");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'diffduel <command> --help' for details.");
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<DuelConfig> {
    match path {
        Some(path) => DuelConfig::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display())),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                DuelConfig::from_file(default_path).wrap_err(format!("loading {CONFIG_FILE}"))
            } else {
                Ok(DuelConfig::default())
            }
        }
    }
}

fn progress_bar(name: &str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new(0);
    pb.set_style(
        indicatif::ProgressStyle::with_template(
            "{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} commits ({elapsed})",
        )
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
    );
    pb.set_message(name.to_string());
    Some(pb)
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryReport {
    name: String,
    #[serde(flatten)]
    status: RepositoryStatus,
    stats: ProcessStats,
}

fn run_analyze(
    config: &DuelConfig,
    repos: Vec<RepositorySpec>,
    max_commits: Option<usize>,
    output: Option<PathBuf>,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let repositories = if repos.is_empty() {
        config.repositories.clone()
    } else {
        repos
    };
    if repositories.is_empty() {
        miette::bail!(miette::miette!(
            help = "Add [[repositories]] entries to .diffduel.toml or pass --repo NAME=PATH",
            "No repositories to analyze"
        ));
    }

    let mut options = TraversalOptions::from(&config.traversal);
    if let Some(max) = max_commits {
        options.max_commits = max;
    }
    let dataset_path = output.unwrap_or_else(|| config.output.dataset.clone());

    let git = GitCli::new();
    if git.version().is_none() {
        tracing::warn!("git executable not found; every diff will fail");
    }

    let mut writer = DatasetWriter::create(&dataset_path)?;
    let mut stats = DatasetStats::default();
    let mut reports = Vec::with_capacity(repositories.len());

    for spec in &repositories {
        eprintln!("Analyzing {} repository...", spec.name);
        let pb = progress_bar(&spec.name);

        let outcome = analyze_repository(spec, &options, &git, |done, total| {
            if let Some(pb) = &pb {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
            }
        });

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        match &outcome.status {
            RepositoryStatus::Analyzed => {}
            RepositoryStatus::NotFound => {
                eprintln!(
                    "Repository path not found: {} (skipping {})",
                    spec.path.display(),
                    spec.name
                );
            }
            RepositoryStatus::Failed(reason) => {
                eprintln!("Could not analyze {}: {reason}", spec.name);
            }
        }

        tracing::debug!(repository = %spec.name, stats = ?outcome.stats(), "repository processed");
        writer.append(&outcome.comparison.records)?;
        stats.add_records(&outcome.comparison.records);
        reports.push(RepositoryReport {
            name: outcome.name.clone(),
            status: outcome.status.clone(),
            stats: outcome.stats(),
        });
    }

    writer.finish()?;
    eprintln!(
        "Wrote {} records to {}",
        writer.written(),
        dataset_path.display()
    );

    let summary = Summary::new(
        &stats,
        &SummaryOptions {
            repository_order: repositories.iter().map(|r| r.name.clone()).collect(),
            max_commits: Some(options.max_commits),
            min_samples: config.report.min_samples,
        },
    );

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "dataset": dataset_path,
                "records": writer.written(),
                "repositories": reports,
                "summary": summary,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Markdown => print!("{}", summary.to_markdown()),
        OutputFormat::Text => println!("{}", summary.render_text(use_color)),
    }
    Ok(())
}

fn run_summary(
    config: &DuelConfig,
    dataset: Option<PathBuf>,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let path = dataset.unwrap_or_else(|| config.output.dataset.clone());
    let records = read_dataset(&path)?;
    let stats = DatasetStats::from_records(&records);
    let summary = Summary::new(
        &stats,
        &SummaryOptions {
            repository_order: config.repository_names(),
            max_commits: Some(config.traversal.max_commits),
            min_samples: config.report.min_samples,
        },
    );

    match format {
        OutputFormat::Json => println!("{}", summary.to_json()?),
        OutputFormat::Markdown => print!("{}", summary.to_markdown()),
        OutputFormat::Text => println!("{}", summary.render_text(use_color)),
    }
    Ok(())
}

fn run_chart(
    config: &DuelConfig,
    dataset: Option<PathBuf>,
    output: Option<PathBuf>,
    min_samples: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let path = dataset.unwrap_or_else(|| config.output.dataset.clone());
    let chart_path = output.unwrap_or_else(|| config.output.chart.clone());
    let min_samples = min_samples.unwrap_or(config.report.min_samples);

    eprintln!("Loading dataset...");
    let records = read_dataset(&path)?;
    eprintln!("Loaded {} records", records.len());

    let data = ChartData::from_stats(&DatasetStats::from_records(&records), min_samples);
    render_chart(
        &data,
        &chart_path,
        config.report.chart_width,
        config.report.chart_height,
    )?;
    eprintln!("Chart saved as {}", chart_path.display());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&data).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("# Chart Summary\n");
            for line in data.summary_lines.iter().filter(|l| !l.is_empty()) {
                println!("- {}", line.trim());
            }
        }
        OutputFormat::Text => {
            for line in &data.summary_lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: String,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: impl Into<String>, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(
    config: &DuelConfig,
    config_path: &Path,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Git executable
    match GitCli::new().version() {
        Some(version) => checks.push(CheckResult::pass("git_executable", version)),
        None => checks.push(CheckResult::fail(
            "git_executable",
            "git --version failed",
            "install git and make sure it is on PATH",
        )),
    }

    // 2. Config file
    if config_path.exists() {
        checks.push(CheckResult::pass(
            "config_file",
            format!(
                "{} found ({} repositories)",
                config_path.display(),
                config.repositories.len()
            ),
        ));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            format!("{} not found", config_path.display()),
            "run 'diffduel init' to create a default config",
        ));
    }

    // 3. Repositories
    if config.repositories.is_empty() {
        checks.push(CheckResult::info(
            "repositories",
            "none configured (pass --repo NAME=PATH to analyze)",
        ));
    }
    for spec in &config.repositories {
        let name = format!("repo {}", spec.name);
        if !spec.path.exists() {
            checks.push(CheckResult::fail(
                name,
                format!("{} does not exist", spec.path.display()),
                "fix the path in [[repositories]]",
            ));
            continue;
        }
        match git2::Repository::open(&spec.path) {
            Ok(_) => checks.push(CheckResult::pass(
                name,
                format!("{} opens as a git repository", spec.path.display()),
            )),
            Err(e) => checks.push(CheckResult::fail(
                name,
                format!("{}: {}", spec.path.display(), e.message()),
                "point the path at the root of a git checkout",
            )),
        }
    }

    // 4. Dataset
    let dataset = &config.output.dataset;
    match count_records(dataset) {
        Ok(count) => checks.push(CheckResult::pass(
            "dataset",
            format!("{} ({count} records)", dataset.display()),
        )),
        Err(diffduel_core::DuelError::FileNotFound(_)) => checks.push(CheckResult::info(
            "dataset",
            format!("{} not found (run 'diffduel analyze' to create)", dataset.display()),
        )),
        Err(e) => checks.push(CheckResult::fail(
            "dataset",
            e.to_string(),
            "delete the file and run 'diffduel analyze' again",
        )),
    }

    // Output
    let version = env!("CARGO_PKG_VERSION");
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            println!("diffduel v{version}: Environment Check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# diffduel configuration

# Repositories to analyze, in report order.
# [[repositories]]
# name = "fastapi"
# path = "../fastapi"

[traversal]
# Commit cap per repository
max_commits = 1000
# "oldest-first" or "newest-first"
order = "oldest-first"
# Merge commits report no modified files unless enabled
include_merges = false

[output]
dataset = "dataset.csv"
chart = "Figure_1.png"

[report]
# Minimum records for a file type to appear in the chart
min_samples = 10
chart_width = 2400
chart_height = 2000
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    tracing::debug!(
        format = %cli.format,
        repositories = config.repositories.len(),
        max_commits = config.traversal.max_commits,
        "configuration loaded"
    );

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Analyze {
            repos,
            max_commits,
            output,
        }) => {
            run_analyze(&config, repos, max_commits, output, cli.format, use_color)?;
        }
        Some(Command::Summary { dataset }) => {
            run_summary(&config, dataset, cli.format, use_color)?;
        }
        Some(Command::Chart {
            dataset,
            output,
            min_samples,
        }) => {
            run_chart(&config, dataset, output, min_samples, cli.format)?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            run_doctor(&config, &config_path, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "diffduel", &mut std::io::stdout());
        }
    }

    Ok(())
}

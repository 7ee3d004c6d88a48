//! promqlinter CLI - lint PromQL expressions from stdin or PrometheusRule manifests

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use promqlinter::cli::{self, FAILURE_MESSAGE};
use promqlinter::config::{parse_denied_label, ColorChoice, Config};
use promqlinter::{ColorMode, Severity};
use std::path::PathBuf;
use std::process::ExitCode;

const EXAMPLES: &str = "\
Examples:
  # lint a raw PromQL expression given on stdin
  echo -n 'http_requests_total{job=\"prometheus\"}' | promqlinter -d job=prometheus

  # lint every expression in a PrometheusRule manifest
  promqlinter -i manifest/sample.yaml

  # lint every manifest under ./manifest
  promqlinter -r -i ./manifest/";

#[derive(Parser)]
#[command(
    name = "promqlinter",
    version,
    about = "A pluggable PromQL linter",
    after_help = EXAMPLES
)]
struct Cli {
    /// Reject label values matching a pattern (repeatable)
    #[arg(short = 'd', long = "denied-label", value_name = "NAME=PATTERN")]
    denied_labels: Vec<String>,

    /// Minimum diagnostic level to report [default: error]
    #[arg(short = 'f', long, value_enum)]
    level_filter: Option<LevelFilter>,

    /// PrometheusRule manifest file or directory (repeatable)
    #[arg(short = 'i', long = "input-k8s-manifest", value_name = "PATH")]
    manifests: Vec<PathBuf>,

    /// Search manifest directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// When to use colors
    #[arg(long, value_enum)]
    color: Option<Color>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelFilter {
    Info,
    Warning,
    Error,
}

impl From<LevelFilter> for Severity {
    fn from(filter: LevelFilter) -> Self {
        match filter {
            LevelFilter::Info => Severity::Info,
            LevelFilter::Warning => Severity::Warning,
            LevelFilter::Error => Severity::Error,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Color {
    Auto,
    Always,
    Never,
}

impl From<Color> for ColorChoice {
    fn from(color: Color) -> Self {
        match color {
            Color::Auto => ColorChoice::Auto,
            Color::Always => ColorChoice::Always,
            Color::Never => ColorChoice::Never,
        }
    }
}

fn load_config(cli: Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load_default().context("failed to load config")?,
    };

    let denied_labels = cli
        .denied_labels
        .iter()
        .map(|flag| parse_denied_label(flag))
        .collect::<Result<Vec<_>, _>>()?;

    config.merge_cli(
        cli.level_filter.map(Severity::from),
        cli.color.map(ColorChoice::from),
        cli.verbose.then_some(true),
        cli.recursive.then_some(true),
        denied_labels,
        cli.manifests,
    );

    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(cli)?;

    let default_filter = if config.output.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let color = config.output.color.resolve_for_stdout();
    colored::control::set_override(color == ColorMode::Enabled);

    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    cli::run(&config, color, stdin, stdout)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("{}: {}", "error".red().bold(), FAILURE_MESSAGE);
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

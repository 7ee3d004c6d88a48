//! Command-line driver: lint stdin or PrometheusRule manifests

use crate::config::Config;
use crate::diagnostic::ColorMode;
use crate::discovery::collect_manifests;
use crate::engine::Linter;
use crate::manifest;
use crate::plugins;
use anyhow::Context;
use log::{debug, info, warn};
use std::io::{BufRead, Write};

/// Printed to stderr when any expression fails the lint
pub const FAILURE_MESSAGE: &str = "some of linter plugins detects the filtered rules";

/// Read all lines from `input` and join them with `\n`
pub fn read_expression<R: BufRead>(input: R) -> std::io::Result<String> {
    let lines = input.lines().collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

/// Lint according to `config`, writing diagnostics to `out`.
///
/// Without manifests the whole of `input` is one expression. Every
/// manifest expression is linted even after a failure. Returns whether
/// all expressions passed; `ok` is written to `out` in that case.
pub fn run<R: BufRead, W: Write>(
    config: &Config,
    color: ColorMode,
    input: R,
    out: W,
) -> anyhow::Result<bool> {
    let filter = config.level_filter;
    let mut linter = Linter::new(out)
        .with_plugins(plugins::defaults(&config.denied_labels, color))
        .with_color(color);

    let mut linted = 0usize;
    let mut failed = 0usize;

    if config.manifests.is_empty() {
        let expression = read_expression(input).context("failed to read expression from stdin")?;
        let result = linter.execute(&expression, filter)?;
        linted += 1;
        if result.failed() {
            failed += 1;
        }
    } else {
        let files = collect_manifests(&config.manifests, config.recursive)
            .context("failed to collect manifests")?;
        if files.is_empty() {
            warn!("no manifests found");
        }

        for file in files {
            let rules = manifest::from_path(&file)
                .with_context(|| format!("failed to load manifest {}", file.display()))?;
            debug!("{}: {} rule expression(s)", file.display(), rules.len());

            for rule in rules {
                let result = linter.execute(&rule.expr, filter).with_context(|| {
                    format!(
                        "failed to lint rule {} in group {} of {}",
                        rule.name.as_deref().unwrap_or("<unnamed>"),
                        rule.group,
                        file.display()
                    )
                })?;
                linted += 1;
                if result.failed() {
                    failed += 1;
                }
            }
        }
    }

    info!("{} expression(s) linted, {} failed", linted, failed);

    let mut out = linter.into_output();
    if failed == 0 {
        writeln!(out, "ok")?;
    }
    out.flush()?;

    Ok(failed == 0)
}

//! Core linter engine

use crate::diagnostic::{ColorMode, Diagnostics, Severity};
use crate::parser;
use crate::plugin::{Plugin, PluginError};
use crate::render::{render, RenderError};
use log::{debug, info};
use std::io::Write;
use thiserror::Error;

/// Producer name used for parse errors
pub const PARSER_NAME: &str = "promql/parser";

/// Error aborting a lint call
#[derive(Debug, Error)]
pub enum LintError {
    #[error("plugin `{plugin}` failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error("failed to render diagnostic: {0}")]
    Render(#[from] RenderError),
}

/// Outcome of linting one expression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LintResult {
    /// At least one diagnostic passed the filter
    pub failed: bool,

    /// Number of diagnostics rendered
    pub reported: usize,
}

impl LintResult {
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn passed(&self) -> bool {
        !self.failed
    }
}

/// The PromQL linter: parses an expression, runs every plugin over the
/// tree and renders what passes the level filter to its output sink.
pub struct Linter<W: Write> {
    plugins: Vec<Box<dyn Plugin>>,
    out: W,
    color: ColorMode,
}

impl<W: Write> Linter<W> {
    /// Create a linter writing to `out`, with no plugins and colors disabled
    pub fn new(out: W) -> Self {
        Self {
            plugins: Vec::new(),
            out,
            color: ColorMode::Disabled,
        }
    }

    /// Append a plugin; plugins run in registration order
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Replace the whole plugin set
    pub fn with_plugins(mut self, plugins: Vec<Box<dyn Plugin>>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Color mode applied to parse-error diagnostics
    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Lint a single expression.
    ///
    /// A parse failure is reported as diagnostics and ends the call
    /// before any plugin runs. Plugin and render errors abort the call;
    /// whatever was already written stays in the sink.
    pub fn execute(&mut self, expression: &str, filter: Severity) -> Result<LintResult, LintError> {
        let expr = match parser::parse(expression) {
            Ok(expr) => expr,
            Err(errors) => {
                debug!("parse failed with {} error(s)", errors.len());
                let diagnostics = Diagnostics::from_parse_errors(&errors, self.color);
                let mut result = self.report(PARSER_NAME, expression, &diagnostics, filter)?;
                // A failed parse fails the lint even if it produced no diagnostics
                result.failed = true;
                return Ok(result);
            }
        };

        let mut result = LintResult::default();
        for plugin in &self.plugins {
            let name = plugin.name();
            debug!("running plugin {}", name);

            let diagnostics = plugin.execute(&expr).map_err(|source| LintError::Plugin {
                plugin: name.to_string(),
                source,
            })?;
            debug!("plugin {} produced {} diagnostic(s)", name, diagnostics.len());

            let reported = report_to(&mut self.out, name, expression, &diagnostics, filter)?;
            result.reported += reported.reported;
            result.failed |= reported.failed;
        }

        info!(
            "linted expression: {} diagnostic(s) at or above {}",
            result.reported, filter
        );
        Ok(result)
    }

    fn report(
        &mut self,
        producer: &str,
        expression: &str,
        diagnostics: &Diagnostics,
        filter: Severity,
    ) -> Result<LintResult, RenderError> {
        report_to(&mut self.out, producer, expression, diagnostics, filter)
    }
}

/// Render the visible diagnostics, in order, and count them
fn report_to<W: Write>(
    out: &mut W,
    producer: &str,
    expression: &str,
    diagnostics: &Diagnostics,
    filter: Severity,
) -> Result<LintResult, RenderError> {
    let mut result = LintResult::default();

    for diagnostic in diagnostics.visible(filter) {
        render(diagnostic, producer, expression, out)?;
        result.reported += 1;
        result.failed = true;
    }

    Ok(result)
}

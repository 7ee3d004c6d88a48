//! Diagnostic types for linting results

use crate::parser::ParseErrors;
use crate::position::SourceRange;
use serde::{Deserialize, Serialize};

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    Warning,
    /// Error - definite problem
    #[default]
    Error,
}

impl Severity {
    /// Token used in rendered headers
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!("level filter must be one of info/warning/error, got `{}`", s)),
        }
    }
}

/// Whether a diagnostic renders with ANSI colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMode {
    Enabled,
    #[default]
    Disabled,
}

impl From<bool> for ColorMode {
    fn from(colored: bool) -> Self {
        if colored {
            ColorMode::Enabled
        } else {
            ColorMode::Disabled
        }
    }
}

/// A lint diagnostic produced by the parser or by a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    level: Severity,
    range: SourceRange,
    message: String,
    color: ColorMode,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        level: Severity,
        range: SourceRange,
        message: impl Into<String>,
        color: ColorMode,
    ) -> Self {
        Self {
            level,
            range,
            message: message.into(),
            color,
        }
    }

    pub fn info(range: SourceRange, message: impl Into<String>, color: ColorMode) -> Self {
        Self::new(Severity::Info, range, message, color)
    }

    pub fn warning(range: SourceRange, message: impl Into<String>, color: ColorMode) -> Self {
        Self::new(Severity::Warning, range, message, color)
    }

    pub fn error(range: SourceRange, message: impl Into<String>, color: ColorMode) -> Self {
        Self::new(Severity::Error, range, message, color)
    }

    pub fn colored_info(range: SourceRange, message: impl Into<String>) -> Self {
        Self::info(range, message, ColorMode::Enabled)
    }

    pub fn colored_warning(range: SourceRange, message: impl Into<String>) -> Self {
        Self::warning(range, message, ColorMode::Enabled)
    }

    pub fn colored_error(range: SourceRange, message: impl Into<String>) -> Self {
        Self::error(range, message, ColorMode::Enabled)
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn range(&self) -> SourceRange {
        self.range
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn color(&self) -> ColorMode {
        self.color
    }

    /// Check if this diagnostic passes the given level filter
    pub fn is_visible(&self, filter: Severity) -> bool {
        self.level >= filter
    }
}

/// Ordered, append-only set of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic, keeping insertion order
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics passing the level filter, in insertion order
    pub fn visible(&self, filter: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.is_visible(filter))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert parser errors into error-level diagnostics
    pub fn from_parse_errors(errors: &ParseErrors, color: ColorMode) -> Self {
        errors
            .iter()
            .map(|e| Diagnostic::error(e.range, e.to_string(), color))
            .collect()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

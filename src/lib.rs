//! promqlinter - a pluggable PromQL linter
//!
//! Parses a PromQL expression, runs a set of analysis plugins over the
//! syntax tree and renders their diagnostics, filtered by severity.
//!
//! # Architecture
//!
//! ```text
//! CLI -> Linter -> parser -> Plugin* -> render -> sink
//! ```
//!
//! A parse failure is reported under the `promql/parser` producer and no
//! plugin runs. Diagnostics are rendered as a header, the source line and
//! a caret marker under the flagged span.
//!
//! # Writing a plugin
//!
//! ```
//! use promqlinter::{Diagnostic, Diagnostics, Expr, Linter, Plugin, PluginError, Severity};
//! use promqlinter::ColorMode;
//!
//! struct NoBareNumbers;
//!
//! impl Plugin for NoBareNumbers {
//!     fn name(&self) -> &str {
//!         "no-bare-numbers"
//!     }
//!
//!     fn execute(&self, expr: &Expr) -> Result<Diagnostics, PluginError> {
//!         let mut ds = Diagnostics::new();
//!         if let Expr::Number(n) = expr {
//!             ds.add(Diagnostic::warning(n.range, "bare number", ColorMode::Disabled));
//!         }
//!         Ok(ds)
//!     }
//! }
//!
//! let mut linter = Linter::new(Vec::<u8>::new()).with_plugin(NoBareNumbers);
//! let result = linter.execute("42", Severity::Warning).unwrap();
//! assert!(result.failed());
//! ```

pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod discovery;
pub mod engine;
pub mod manifest;
pub mod parser;
pub mod plugin;
pub mod plugins;
pub mod position;
pub mod render;

// Re-export main types
pub use config::{ColorChoice, Config};
pub use diagnostic::{ColorMode, Diagnostic, Diagnostics, Severity};
pub use engine::{LintError, LintResult, Linter, PARSER_NAME};
pub use parser::{parse, Expr, ParseError, ParseErrors};
pub use plugin::{Plugin, PluginError};
pub use plugins::DeniedLabelPlugin;
pub use position::{to_2d, Position2d, SourceRange};
pub use render::{render, RenderError};

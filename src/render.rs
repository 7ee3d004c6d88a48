//! Three-line diagnostic renderer
//!
//! ```text
//! denied-labels<[ERROR] (1:0) matched to the denied label rule `prometheus`
//! L1| http_requests_total{job="prometheus"}
//!     ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ matched to the denied label rule `prometheus`
//! ```

use crate::diagnostic::{ColorMode, Diagnostic, Severity};
use crate::position::{line_start_offset, line_text, to_2d};
use colored::*;
use std::io::Write;
use thiserror::Error;

/// Error while writing a diagnostic
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("range [{start}, {end}) does not fit an expression of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },
}

fn paint(level: Severity, s: &str) -> ColoredString {
    match level {
        Severity::Info => s.bright_blue(),
        Severity::Warning => s.bright_yellow(),
        Severity::Error => s.bright_red(),
    }
}

/// Write `diagnostic` as a header, the offending source line and a caret marker.
///
/// The range is validated against `text` before anything is written.
pub fn render<W: Write + ?Sized>(
    diagnostic: &Diagnostic,
    producer: &str,
    text: &str,
    out: &mut W,
) -> Result<(), RenderError> {
    let range = diagnostic.range();
    if !range.fits(text.len()) {
        return Err(RenderError::InvalidRange {
            start: range.start,
            end: range.end,
            len: text.len(),
        });
    }

    let colored = diagnostic.color() == ColorMode::Enabled;
    let level = diagnostic.level();
    let message = diagnostic.message();
    let pos = to_2d(text, range);

    let label = if colored {
        paint(level, level.label()).to_string()
    } else {
        level.label().to_string()
    };
    writeln!(out, "{}<[{}] {} {}", producer, label, pos, message)?;

    let prefix = format!("L{}| ", pos.line);
    let line = line_text(text, pos.line);
    if colored {
        writeln!(out, "{}{}", prefix, highlight(line, text, pos.line, diagnostic))?;
    } else {
        writeln!(out, "{}{}", prefix, line)?;
    }

    let padding = " ".repeat(prefix.len() + pos.column);
    let carets = "^".repeat(range.len());
    if colored {
        writeln!(
            out,
            "{}{} {}",
            padding,
            paint(level, &carets),
            paint(level, message)
        )?;
    } else {
        writeln!(out, "{}{} {}", padding, carets, message)?;
    }

    Ok(())
}

/// Color the flagged bytes of `line` in place.
///
/// Only the part of the range on this line is wrapped; a span that does
/// not land on character boundaries leaves the line untouched.
fn highlight(line: &str, text: &str, line_number: usize, diagnostic: &Diagnostic) -> String {
    let range = diagnostic.range();
    let line_start = line_start_offset(text, line_number);

    let from = range.start.saturating_sub(line_start).min(line.len());
    let to = range.end.saturating_sub(line_start).min(line.len());

    match (line.get(..from), line.get(from..to), line.get(to..)) {
        (Some(before), Some(flagged), Some(after)) if !flagged.is_empty() => {
            format!("{}{}{}", before, paint(diagnostic.level(), flagged), after)
        }
        _ => line.to_string(),
    }
}

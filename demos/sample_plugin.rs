//! A custom plugin wired into the linter by hand.
//!
//! Run with `cargo run --example sample_plugin`.

use promqlinter::{
    Diagnostic, Diagnostics, Expr, Linter, Plugin, PluginError, Severity, SourceRange,
};
use std::process::ExitCode;

struct SamplePlugin;

impl Plugin for SamplePlugin {
    fn name(&self) -> &str {
        "sample-plugin"
    }

    fn execute(&self, _expr: &Expr) -> Result<Diagnostics, PluginError> {
        Ok(["foo", "bar", "baz"]
            .into_iter()
            .map(|message| Diagnostic::colored_info(SourceRange::default(), message))
            .collect())
    }
}

fn main() -> ExitCode {
    let mut linter = Linter::new(std::io::stdout()).with_plugin(SamplePlugin);

    // Info diagnostics stay below the warning filter
    match linter.execute("http_requests_total", Severity::Warning) {
        Ok(result) if result.failed() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

//! Plugin protocol for syntax-tree analysis

use crate::diagnostic::Diagnostics;
use crate::parser::Expr;
use thiserror::Error;

/// Error raised by a plugin while analysing an expression
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// A named analysis rule run over a parsed expression
pub trait Plugin: Send + Sync {
    /// Producer name printed in front of every rendered diagnostic
    fn name(&self) -> &str;

    /// Inspect the syntax tree and report findings.
    ///
    /// Configuration is supplied when the plugin is constructed.
    fn execute(&self, expr: &Expr) -> Result<Diagnostics, PluginError>;
}

impl<P: Plugin + ?Sized> Plugin for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, expr: &Expr) -> Result<Diagnostics, PluginError> {
        (**self).execute(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_error_display() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = PluginError::InvalidPattern {
            pattern: "(".to_string(),
            source,
        };
        assert!(format!("{}", err).starts_with("invalid pattern `(`: "));

        let err = PluginError::Other("backend unavailable".to_string());
        assert_eq!(format!("{}", err), "backend unavailable");
    }
}

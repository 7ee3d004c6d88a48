//! `denied-labels`: reject selectors whose label values match a pattern

use crate::config::{parse_denied_label, ConfigError};
use crate::diagnostic::{ColorMode, Diagnostic, Diagnostics};
use crate::parser::{inspect, Expr, METRIC_NAME_LABEL};
use crate::plugin::{Plugin, PluginError};
use regex::Regex;
use std::collections::BTreeMap;

pub const NAME: &str = "denied-labels";

/// Flags every selector with a matcher `label op value` where `label`
/// has a configured pattern and the pattern matches `value`.
#[derive(Debug, Clone, Default)]
pub struct DeniedLabelPlugin {
    /// Label name -> pattern
    rules: BTreeMap<String, String>,
    color: ColorMode,
}

impl DeniedLabelPlugin {
    pub fn new(rules: BTreeMap<String, String>, color: ColorMode) -> Self {
        Self { rules, color }
    }

    /// Build from repeated `name=pattern` flags
    pub fn from_flags<S: AsRef<str>>(flags: &[S], color: ColorMode) -> Result<Self, ConfigError> {
        let rules = flags
            .iter()
            .map(|flag| parse_denied_label(flag.as_ref()))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self::new(rules, color))
    }

    pub fn rules(&self) -> &BTreeMap<String, String> {
        &self.rules
    }
}

impl Plugin for DeniedLabelPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn execute(&self, expr: &Expr) -> Result<Diagnostics, PluginError> {
        let mut ds = Diagnostics::new();
        // Compiled once per call; an invalid pattern only fails when a
        // matcher on its label is actually encountered.
        let mut compiled: BTreeMap<&str, Regex> = BTreeMap::new();

        inspect(expr, |node, _path| -> Result<(), PluginError> {
            let Some(selector) = node.as_selector() else {
                return Ok(());
            };

            for matcher in &selector.matchers {
                if matcher.name == METRIC_NAME_LABEL {
                    continue;
                }

                let Some(pattern) = self.rules.get(&matcher.name) else {
                    continue;
                };

                if !compiled.contains_key(pattern.as_str()) {
                    let re = Regex::new(pattern).map_err(|source| PluginError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                    compiled.insert(pattern.as_str(), re);
                }
                let re = &compiled[pattern.as_str()];

                if re.is_match(&matcher.value) {
                    ds.add(Diagnostic::error(
                        selector.range,
                        format!("matched to the denied label rule `{}`", pattern),
                        self.color,
                    ));
                }
            }

            Ok(())
        })?;

        Ok(ds)
    }
}

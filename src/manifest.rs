//! Kubernetes `PrometheusRule` manifests

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PrometheusRule {
    kind: Option<String>,
    spec: Option<RuleSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuleSpec {
    groups: Vec<RuleGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuleGroup {
    name: String,
    rules: Vec<Rule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Rule {
    record: Option<String>,
    alert: Option<String>,
    expr: Option<IntOrString>,
}

/// `expr` is an int-or-string in the CRD schema
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for IntOrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntOrString::Int(i) => write!(f, "{}", i),
            IntOrString::Float(v) => write!(f, "{}", v),
            IntOrString::String(s) => write!(f, "{}", s),
        }
    }
}

/// One rule expression taken from a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleExpression {
    /// Name of the rule group
    pub group: String,
    /// `record` or `alert` name, when present
    pub name: Option<String>,
    pub expr: String,
}

/// Decode every YAML document in `content` and collect its rule
/// expressions in document, group and rule order.
pub fn expressions_from_str(content: &str) -> Result<Vec<RuleExpression>, ManifestError> {
    let mut expressions = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        let manifest: PrometheusRule = serde_yaml::from_value(value)?;

        if let Some(kind) = manifest.kind.as_deref().filter(|k| *k != "PrometheusRule") {
            log::debug!("skipping document of kind {}", kind);
            continue;
        }

        let Some(spec) = manifest.spec else {
            continue;
        };
        for group in spec.groups {
            for rule in group.rules {
                let Some(expr) = rule.expr else {
                    continue;
                };
                expressions.push(RuleExpression {
                    group: group.name.clone(),
                    name: rule.record.or(rule.alert),
                    expr: expr.to_string(),
                });
            }
        }
    }

    Ok(expressions)
}

/// Read a manifest file and collect its rule expressions
pub fn from_path(path: &Path) -> Result<Vec<RuleExpression>, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    log::debug!("reading manifest {}", path.display());
    expressions_from_str(&content)
}

//! Built-in plugins

pub mod denied_label;

pub use denied_label::DeniedLabelPlugin;

use crate::diagnostic::ColorMode;
use crate::plugin::Plugin;
use std::collections::BTreeMap;

/// The default plugin set, in execution order
pub fn defaults(denied_labels: &BTreeMap<String, String>, color: ColorMode) -> Vec<Box<dyn Plugin>> {
    vec![Box::new(DeniedLabelPlugin::new(denied_labels.clone(), color))]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let plugins = defaults(&BTreeMap::new(), ColorMode::Disabled);
        let names: Vec<&str> = plugins.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec![denied_label::NAME]);
    }
}

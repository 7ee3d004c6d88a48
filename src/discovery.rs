//! Manifest file discovery

use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions treated as manifests when searching directories
pub const MANIFEST_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("IO error: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Expand the given paths into manifest files.
///
/// Files are returned as given, in order. A directory contributes its
/// `*.yaml`/`*.yml` files, sorted, searching subdirectories only when
/// `recursive` is set.
pub fn collect_manifests<P: AsRef<Path>>(
    paths: &[P],
    recursive: bool,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut manifests = Vec::new();

    for path in paths {
        let path = path.as_ref();

        if path.is_dir() {
            let found = search_directory(path, recursive)?;
            log::debug!("found {} manifest(s) under {}", found.len(), path.display());
            manifests.extend(found);
        } else if path.exists() {
            manifests.push(path.to_path_buf());
        } else {
            return Err(DiscoveryError::NotFound(path.to_path_buf()));
        }
    }

    Ok(manifests)
}

fn search_directory(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, DiscoveryError> {
    let base = Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();

    for ext in MANIFEST_EXTENSIONS {
        let pattern = if recursive {
            format!("{}/**/*.{}", base, ext)
        } else {
            format!("{}/*.{}", base, ext)
        };

        let entries = glob(&pattern).map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry?;
            if entry.is_file() {
                files.push(entry);
            }
        }
    }

    files.sort();
    Ok(files)
}

use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;
use walkdir::WalkDir;

/// Lists the files an import may name.
pub(crate) trait ImportableFiles: Send + Sync {
    fn files(&self) -> anyhow::Result<Vec<String>>;
}

const EXTENSIONS: [&str; 2] = ["jsonnet", "libsonnet"];

/// Jsonnet sources under the configured library paths, relative to the
/// path they were found in.
#[derive(Debug, Clone, Default)]
pub(crate) struct LibPaths {
    roots: Vec<PathBuf>,
}

impl LibPaths {
    pub(crate) fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

impl ImportableFiles for LibPaths {
    fn files(&self) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        for root in &self.roots {
            if !root.is_dir() {
                warn!(path = %root.display(), "library path is not a directory");
                continue;
            }
            for entry in WalkDir::new(root).follow_links(true).into_iter().filter_map(Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let wanted = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| EXTENSIONS.contains(&ext));
                if !wanted {
                    continue;
                }
                let relative = path
                    .strip_prefix(root)
                    .with_context(|| format!("{} escaped {}", path.display(), root.display()))?;
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(name);
            }
        }
        out.sort();
        out.dedup();
        Ok(out)
    }
}

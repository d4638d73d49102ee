use crate::{EngineError, Result};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use synapse_protocol::path_filters::{normalize_path, path_in_scope};

/// Directory discovery rules used when no specification document lists the
/// project files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Directory names skipped at any depth (case-insensitive)
    pub ignored_dirs: Vec<String>,

    /// File extensions (without the dot) that become nodes
    pub extensions: Vec<String>,

    /// Honor `.gitignore`, `.ignore` and global git excludes
    pub respect_gitignore: bool,

    /// Include hidden files and directories
    pub include_hidden: bool,

    /// Files larger than this are left out of discovery
    pub max_file_bytes: u64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: strings(&[
                // VCS / tooling
                ".git",
                ".hg",
                ".svn",
                ".idea",
                ".vscode",
                ".synapse",
                // dependencies / caches / builds
                "node_modules",
                "__pycache__",
                ".pytest_cache",
                ".mypy_cache",
                ".venv",
                "venv",
                "env",
                ".cache",
                ".next",
                ".turbo",
                "target",
                "build",
                "dist",
                "out",
                "coverage",
                "vendor",
                "third_party",
            ]),
            extensions: strings(&[
                "py", "rs", "js", "mjs", "cjs", "jsx", "ts", "tsx", "go", "java", "kt", "kts",
                "cs", "c", "h", "cpp", "cc", "cxx", "hpp", "rb", "swift", "md", "json", "toml",
                "yaml", "yml",
            ]),
            respect_gitignore: true,
            include_hidden: false,
            max_file_bytes: 1_048_576,
        }
    }
}

impl WalkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(EngineError::invalid_config(
                "walk.extensions must name at least one extension",
            ));
        }
        if self.max_file_bytes == 0 {
            return Err(EngineError::invalid_config(
                "walk.max_file_bytes must be > 0",
            ));
        }
        Ok(())
    }
}

/// Recursive, ignore-aware discovery of project files
pub struct ProjectWalker {
    root: PathBuf,
    config: WalkConfig,
}

impl ProjectWalker {
    pub fn new(root: impl AsRef<Path>, config: WalkConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
        }
    }

    /// Normalized project-relative paths, sorted, restricted to `scope`
    /// (an empty scope admits everything)
    pub fn walk(&self, scope: &[String]) -> Vec<String> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let ignored: Vec<String> = self
            .config
            .ignored_dirs
            .iter()
            .map(|dir| dir.to_lowercase())
            .collect();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .ignore(self.config.respect_gitignore)
            .require_git(false);
        builder.filter_entry(move |entry| !is_ignored_dir(entry.path(), &root, &ignored));

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Failed to read entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.has_allowed_extension(path) {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                if meta.len() > self.config.max_file_bytes {
                    log::debug!(
                        "Skipping large file {} ({} bytes > {})",
                        path.display(),
                        meta.len(),
                        self.config.max_file_bytes
                    );
                    continue;
                }
            }

            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let relative = normalize_path(&relative.to_string_lossy());
            if relative.is_empty() || !path_in_scope(&relative, scope) {
                continue;
            }
            files.push(relative);
        }

        files.sort();
        log::info!("Discovered {} project files", files.len());
        files
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.config
            .extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

fn is_ignored_dir(path: &Path, root: &Path, ignored: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let lowered = name.to_string_lossy().to_lowercase();
            ignored.iter().any(|dir| dir == &lowered)
        }
        _ => false,
    })
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

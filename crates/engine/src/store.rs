use crate::normalize::NormalizeRules;
use crate::{EngineError, Result};
use std::path::{Path, PathBuf};
use synapse_graph::GraphSnapshot;

/// The durable graph on disk: one normalized JSON document.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so readers see either the previous or the next state, never a partial
/// one.
pub struct GraphStore {
    path: PathBuf,
    rules: NormalizeRules,
}

impl GraphStore {
    pub fn new(path: impl AsRef<Path>, rules: NormalizeRules) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            rules,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// A missing store is an empty graph; an unreadable one is an error
    pub async fn load(&self) -> Result<GraphSnapshot> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(GraphSnapshot::new());
            }
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(GraphSnapshot::new());
        }
        serde_json::from_slice(&bytes).map_err(|err| EngineError::CorruptState {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        })
    }

    /// Canonical text of the durable part of `graph`
    pub fn render(&self, graph: &GraphSnapshot) -> Result<String> {
        self.rules.to_canonical_string(&graph.durable())
    }

    /// Persist the durable part of `graph`. Returns whether the file changed.
    pub async fn save(&self, graph: &GraphSnapshot) -> Result<bool> {
        let text = self.render(graph)?;
        if let Ok(current) = tokio::fs::read_to_string(&self.path).await {
            if current == text {
                return Ok(false);
            }
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text.as_bytes()).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        log::debug!("Wrote {}", self.path.display());
        Ok(true)
    }
}

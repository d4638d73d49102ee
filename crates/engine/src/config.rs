use crate::normalize::NormalizeRules;
use crate::walker::WalkConfig;
use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use synapse_graph::{AnalyzerConfig, FlowConfig, LayoutConfig, PlacementConfig};
use synapse_scanner::ScannerConfig;
use synapse_spec_parser::ParserRules;

/// Directory holding the durable store, its lock and the optional config file
pub const STATE_DIR_NAME: &str = ".synapse";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const GRAPH_FILE_NAME: &str = "graph.json";

/// Where the specification document lives and how the project is scanned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Explicit specification document, relative to the project root
    pub spec_document: Option<PathBuf>,

    /// Tried in order when `spec_document` is unset
    pub spec_candidates: Vec<String>,

    /// Scan-scope allow-list; a scope declared by the document is added
    pub scope: Vec<String>,

    /// Fan-out window for per-file scans (`SYNAPSE_SCAN_CONCURRENCY` wins)
    pub scan_concurrency: Option<usize>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            spec_document: None,
            spec_candidates: vec![
                "SPEC.md".to_string(),
                "spec.md".to_string(),
                "ARCHITECTURE.md".to_string(),
                "architecture.md".to_string(),
            ],
            scope: Vec::new(),
            scan_concurrency: None,
        }
    }
}

/// Every rule set of the pipeline. All sections and fields are optional in
/// `.synapse/config.toml`:
///
/// ```toml
/// [project]
/// spec_document = "docs/SPEC.md"
///
/// [analyzer]
/// min_bottleneck_degree = 4
///
/// [walk]
/// extensions = ["py", "md"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynapseConfig {
    pub project: ProjectConfig,
    pub scanner: ScannerConfig,
    pub parser: ParserRules,
    pub layout: LayoutConfig,
    pub flow: FlowConfig,
    pub analyzer: AnalyzerConfig,
    pub placement: PlacementConfig,
    pub normalize: NormalizeRules,
    pub walk: WalkConfig,
}

impl SynapseConfig {
    /// Read `<root>/.synapse/config.toml`; a missing file means defaults
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(STATE_DIR_NAME).join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let config = Self::from_toml(&text).map_err(|err| match err {
            EngineError::InvalidConfig(reason) => {
                EngineError::invalid_config(format!("{}: {reason}", path.display()))
            }
            other => other,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| EngineError::invalid_config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.scanner.validate()?;
        self.parser.validate()?;
        self.layout.validate()?;
        self.flow.validate()?;
        self.analyzer.validate()?;
        self.placement.validate()?;
        self.normalize.validate()?;
        self.walk.validate()?;

        if self.project.scan_concurrency == Some(0) {
            return Err(EngineError::invalid_config(
                "project.scan_concurrency must be > 0",
            ));
        }
        Ok(())
    }

    /// The specification document to seed from, if one exists on disk
    pub fn spec_path(&self, root: &Path) -> Option<PathBuf> {
        if let Some(explicit) = &self.project.spec_document {
            let path = root.join(explicit);
            return path.is_file().then_some(path);
        }
        self.project
            .spec_candidates
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        assert!(SynapseConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = SynapseConfig::from_toml(
            r#"
            [project]
            scope = ["src"]

            [analyzer]
            min_bottleneck_degree = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.project.scope, vec!["src"]);
        assert_eq!(config.analyzer.min_bottleneck_degree, 7);
        assert_eq!(
            config.analyzer.entry_names,
            AnalyzerConfig::default().entry_names
        );
        assert_eq!(config.walk, WalkConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SynapseConfig::from_toml("[project]\nscan_concurrency = 0\n").is_err());
        assert!(SynapseConfig::from_toml("[walk]\nextensions = []\n").is_err());
        assert!(SynapseConfig::from_toml("not toml at all = = =").is_err());
    }

    #[test]
    fn explicit_document_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spec.md"), "- 📄 src/app.py\n").unwrap();

        let config = SynapseConfig::default();
        assert_eq!(config.spec_path(dir.path()), Some(dir.path().join("spec.md")));

        let mut explicit = SynapseConfig::default();
        explicit.project.spec_document = Some(PathBuf::from("docs/missing.md"));
        assert_eq!(explicit.spec_path(dir.path()), None);
    }
}

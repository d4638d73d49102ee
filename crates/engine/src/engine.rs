use crate::config::{SynapseConfig, GRAPH_FILE_NAME, STATE_DIR_NAME};
use crate::limits::scan_concurrency;
use crate::stats::RefreshStats;
use crate::store::GraphStore;
use crate::store_lock::acquire_store_write_lock;
use crate::walker::ProjectWalker;
use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use synapse_graph::{
    CompositeGraph, FlowExtractor, FlowView, GraphAssembler, GraphBuilder, GraphEditor,
    GraphSnapshot, Mutation, NodeStatus, ProposedFile, StructuralAnalyzer, StructuralReport,
};
use synapse_protocol::path_filters::{normalize_path, path_in_scope};
use synapse_scanner::{Flow, FlowScanner, Language, ScanSummary, SymbolScanner};
use synapse_spec_parser::{ProjectStructure, SpecParser};
use tokio::task::JoinSet;

/// Where the nodes of a seed came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    Specification,
    Discovery,
}

/// Outcome of [`ProjectEngine::seed`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedReport {
    pub source: SeedSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub nodes_added: usize,
    pub edges_added: usize,
    /// Declared by the document but missing on disk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proposed: Vec<String>,
    pub written: bool,
}

/// A parsed specification document
#[derive(Debug, Clone)]
struct SpecDocument {
    path: PathBuf,
    structure: ProjectStructure,
}

/// Request pipeline over one project directory.
///
/// Reads (`state`, `refresh`, `flow_view`, `analyze`) never write; every
/// mutation is a locked read-modify-write of the durable store.
pub struct ProjectEngine {
    root: PathBuf,
    state_dir: PathBuf,
    config: SynapseConfig,
    symbols: Arc<SymbolScanner>,
    flows: FlowScanner,
    parser: SpecParser,
    builder: GraphBuilder,
    assembler: GraphAssembler,
    editor: GraphEditor,
    extractor: FlowExtractor,
    analyzer: StructuralAnalyzer,
    store: GraphStore,
    cancel: Arc<AtomicBool>,
}

impl ProjectEngine {
    /// Engine for `root` with `.synapse/config.toml` applied when present
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let config = SynapseConfig::load(root)?;
        Self::with_config(root, config)
    }

    pub fn with_config(root: impl AsRef<Path>, config: SynapseConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(EngineError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        config.validate()?;

        let state_dir = root.join(STATE_DIR_NAME);
        let store = GraphStore::new(state_dir.join(GRAPH_FILE_NAME), config.normalize.clone());

        Ok(Self {
            symbols: Arc::new(SymbolScanner::new(config.scanner.clone())?),
            flows: FlowScanner::new(config.scanner.clone())?,
            parser: SpecParser::new(config.parser.clone())?,
            builder: GraphBuilder::new(config.layout.clone())?,
            assembler: GraphAssembler::new(config.layout.clone(), config.placement.clone())?,
            editor: GraphEditor::new(
                GraphBuilder::new(config.layout.clone())?,
                config.placement.clone(),
            )?,
            extractor: FlowExtractor::new(config.flow.clone()),
            analyzer: StructuralAnalyzer::new(config.analyzer.clone()),
            store,
            cancel: Arc::new(AtomicBool::new(false)),
            root,
            state_dir,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SynapseConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Stop the running refresh (or, if none runs, the next one) before it
    /// starts further file scans. Scans already in flight complete.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Parse an arbitrary specification document
    pub fn parse_spec(&self, path: impl AsRef<Path>) -> ProjectStructure {
        self.parser.parse_file(path)
    }

    /// Symbols and references of one project file
    pub fn scan_file(&self, rel_path: &str) -> ScanSummary {
        self.symbols.scan_file(self.root.join(normalize_path(rel_path)))
    }

    /// Control flow of one project file, named by its relative path
    pub async fn flow_for_file(&self, rel_path: &str) -> Flow {
        let rel_path = normalize_path(rel_path);
        match tokio::fs::read(self.root.join(&rel_path)).await {
            Ok(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.flows.scan_str(&rel_path, text),
                Err(_) => {
                    log::debug!("No flow for {rel_path}: not UTF-8");
                    Flow::trivial(rel_path)
                }
            },
            Err(err) => {
                log::debug!("Cannot read {rel_path}: {err}");
                Flow::trivial(rel_path)
            }
        }
    }

    /// Fold the document's files (or, without one, the discovered files)
    /// into the durable graph. Existing nodes keep identity and placement.
    pub async fn seed(&self) -> Result<SeedReport> {
        let _lock = acquire_store_write_lock(&self.state_dir).await?;

        let spec = self.load_spec();
        let existing = self.store.load().await?;
        let (seeded, source) = self.seeded_graph(spec.as_ref()).await?;
        let merged = self.builder.merge(&existing, &seeded);

        let scope = self.scope(spec.as_ref());
        let proposed = self
            .proposed_files(spec.as_ref(), &merged, &scope)
            .into_iter()
            .map(|file| file.path)
            .collect();
        let report = SeedReport {
            source,
            document: spec.as_ref().map(|doc| self.display_path(&doc.path)),
            nodes_added: merged.nodes.len().saturating_sub(existing.nodes.len()),
            edges_added: merged.edges.len().saturating_sub(existing.edges.len()),
            proposed,
            written: self.store.save(&merged).await?,
        };
        log::info!(
            "Seeded {} nodes and {} edges ({:?})",
            report.nodes_added,
            report.edges_added,
            report.source
        );
        Ok(report)
    }

    /// The composite graph handed to the renderer
    pub async fn state(&self) -> Result<CompositeGraph> {
        Ok(self.refresh().await?.0)
    }

    /// Scan every node's file, derive volatile edges and lay out the result
    pub async fn refresh(&self) -> Result<(CompositeGraph, RefreshStats)> {
        let started = Instant::now();
        let spec = self.load_spec();
        let durable = self.load_durable(spec.as_ref()).await?;
        let scope = self.scope(spec.as_ref());

        let mut stats = RefreshStats::new();
        let summaries = self.scan_nodes(&durable, &scope, &mut stats).await;
        let proposed = self.proposed_files(spec.as_ref(), &durable, &scope);
        let composite = self.assembler.assemble(&durable, &summaries, &proposed);

        stats.volatile_edges = composite.report.volatile_edges;
        stats.dangling_dropped = composite.report.dangling_dropped;
        stats.time_ms = started.elapsed().as_millis() as u64;

        log::info!(
            "Refreshed {} nodes: {} files scanned, {} volatile edges in {}ms",
            composite.graph.nodes.len(),
            stats.files_scanned,
            stats.volatile_edges,
            stats.time_ms
        );
        Ok((composite, stats))
    }

    /// Architecture-level flow over the composite graph
    pub async fn flow_view(&self) -> Result<FlowView> {
        let composite = self.state().await?;
        Ok(self.extractor.extract(&composite.graph))
    }

    pub async fn analyze(&self) -> Result<StructuralReport> {
        let composite = self.state().await?;
        Ok(self.analyzer.analyze(&composite.graph))
    }

    /// Apply one mutation as a locked read-modify-write of the durable
    /// store. On error nothing is written.
    pub async fn apply(&self, mutation: &Mutation) -> Result<GraphSnapshot> {
        let _lock = acquire_store_write_lock(&self.state_dir).await?;

        let spec = self.load_spec();
        let mut current = self.load_durable(spec.as_ref()).await?;

        if let Mutation::PromoteNode { id } = mutation {
            if !current.contains_node(id) {
                let scope = self.scope(spec.as_ref());
                let declared = self
                    .proposed_files(spec.as_ref(), &current, &scope)
                    .into_iter()
                    .find(|file| &file.path == id);
                if let Some(file) = declared {
                    let mut node = self.builder.node(&file.path, file.kind, current.nodes.len());
                    node.status = NodeStatus::Proposed;
                    current.nodes.push(node);
                }
            }
        }

        let next = self.editor.apply(&current, mutation)?;
        self.store.save(&next).await?;
        log::info!("Applied {}", mutation.name());
        Ok(next)
    }

    fn load_spec(&self) -> Option<SpecDocument> {
        let path = self.config.spec_path(&self.root)?;
        let structure = self.parser.parse_file(&path);
        if structure.is_empty() {
            log::info!(
                "{} declares no files, falling back to discovery",
                path.display()
            );
        }
        Some(SpecDocument { path, structure })
    }

    fn scope(&self, spec: Option<&SpecDocument>) -> Vec<String> {
        let mut scope: Vec<String> = Vec::new();
        let declared = spec.map(|doc| doc.structure.scope.as_slice()).unwrap_or(&[]);
        for entry in self.config.project.scope.iter().chain(declared) {
            let entry = normalize_path(entry);
            if !entry.is_empty() && !scope.contains(&entry) {
                scope.push(entry);
            }
        }
        scope
    }

    fn on_disk(&self, rel_path: &str) -> bool {
        self.root.join(rel_path).is_file()
    }

    fn display_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        normalize_path(&relative.to_string_lossy())
    }

    /// Durable graph, or an unsaved seed when the store does not exist yet
    async fn load_durable(&self, spec: Option<&SpecDocument>) -> Result<GraphSnapshot> {
        if self.store.exists() {
            return self.store.load().await;
        }
        Ok(self.seeded_graph(spec).await?.0)
    }

    async fn seeded_graph(
        &self,
        spec: Option<&SpecDocument>,
    ) -> Result<(GraphSnapshot, SeedSource)> {
        if let Some(doc) = spec.filter(|doc| !doc.structure.is_empty()) {
            let mut present = doc.structure.clone();
            present.files.retain(|entry| self.on_disk(&normalize_path(&entry.path)));
            return Ok((self.builder.from_structure(&present), SeedSource::Specification));
        }

        let walker = ProjectWalker::new(&self.root, self.config.walk.clone());
        let scope = self.scope(spec);
        let files = tokio::task::spawn_blocking(move || walker.walk(&scope))
            .await
            .map_err(|err| EngineError::Other(format!("join discovery task: {err}")))?;
        Ok((self.builder.from_paths(files), SeedSource::Discovery))
    }

    fn proposed_files(
        &self,
        spec: Option<&SpecDocument>,
        durable: &GraphSnapshot,
        scope: &[String],
    ) -> Vec<ProposedFile> {
        let Some(doc) = spec else {
            return Vec::new();
        };
        doc.structure
            .files
            .iter()
            .map(|entry| ProposedFile {
                path: normalize_path(&entry.path),
                kind: entry.kind,
            })
            .filter(|file| {
                !file.path.is_empty()
                    && path_in_scope(&file.path, scope)
                    && !durable.contains_node(&file.path)
                    && !self.on_disk(&file.path)
            })
            .collect()
    }

    /// Scan node files in windows of the configured fan-out. Results are
    /// keyed by node id, so completion order does not matter.
    async fn scan_nodes(
        &self,
        durable: &GraphSnapshot,
        scope: &[String],
        stats: &mut RefreshStats,
    ) -> HashMap<String, ScanSummary> {
        let mut targets: Vec<(String, PathBuf)> = Vec::new();
        for node in &durable.nodes {
            if node.status == NodeStatus::Archived {
                continue;
            }
            let Some(path) = node.path() else {
                stats.add_skipped();
                continue;
            };
            if !path_in_scope(path, scope) {
                continue;
            }
            let absolute = self.root.join(path);
            if !absolute.is_file() {
                log::debug!("No file for node {path}");
                stats.add_skipped();
                continue;
            }
            targets.push((node.id.clone(), absolute));
        }

        let window = scan_concurrency(self.config.project.scan_concurrency);
        let mut summaries = HashMap::with_capacity(targets.len());
        let mut started = 0usize;

        'windows: for batch in targets.chunks(window) {
            let mut tasks = JoinSet::new();
            for (id, absolute) in batch {
                if self.cancel.load(Ordering::SeqCst) {
                    drain(&mut tasks, &mut summaries, stats).await;
                    break 'windows;
                }
                let scanner = Arc::clone(&self.symbols);
                let (id, absolute) = (id.clone(), absolute.clone());
                tasks.spawn_blocking(move || {
                    let summary = scanner.scan_file(&absolute);
                    (id, Language::from_path(&absolute), summary)
                });
                started += 1;
            }
            drain(&mut tasks, &mut summaries, stats).await;
        }

        let not_started = targets.len() - started;
        if not_started > 0 {
            log::info!("Refresh cancelled, {not_started} files not scanned");
            stats.files_skipped += not_started;
            stats.cancelled = true;
        }
        self.cancel.store(false, Ordering::SeqCst);
        summaries
    }
}

async fn drain(
    tasks: &mut JoinSet<(String, Language, ScanSummary)>,
    summaries: &mut HashMap<String, ScanSummary>,
    stats: &mut RefreshStats,
) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, language, summary)) => {
                stats.add_file(
                    language.as_str(),
                    summary.symbols.len(),
                    summary.references.len(),
                );
                summaries.insert(id, summary);
            }
            Err(err) => {
                log::warn!("Scan task failed: {err}");
                stats.add_skipped();
            }
        }
    }
}

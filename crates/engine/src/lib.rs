//! # Synapse Engine
//!
//! Request pipeline over a project directory: seeding, bounded concurrent
//! scans, the durable store and the state normalizer.
//!
//! ## Pipeline
//!
//! ```text
//! Project root
//!     │
//!     ├──> Spec document ──> SpecParser ──> ProjectStructure
//!     │      └─ (no files) ──> ProjectWalker (.gitignore aware)
//!     │
//!     ├──> GraphStore (.synapse/graph.json, normalized, atomic rename)
//!     │      └─> durable graph
//!     │
//!     ├──> SymbolScanner per node file (windowed, cancellable)
//!     │      └─> scan summaries
//!     │
//!     └──> GraphAssembler ──> composite graph
//!            ├─> FlowExtractor ──> flow view
//!            └─> StructuralAnalyzer ──> report
//! ```
//!
//! Mutations hold an exclusive lock on `.synapse/graph.lock` for the whole
//! read-modify-write cycle.
//!
//! ## Example
//!
//! ```no_run
//! use synapse_engine::ProjectEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = ProjectEngine::new("/path/to/project")?;
//!     engine.seed().await?;
//!     let (composite, stats) = engine.refresh().await?;
//!
//!     println!(
//!         "{} nodes, {} files scanned",
//!         composite.graph.nodes.len(),
//!         stats.files_scanned
//!     );
//!     Ok(())
//! }
//! ```

mod config;
mod engine;
mod error;
mod limits;
mod normalize;
mod stats;
mod store;
mod store_lock;
mod walker;

pub use config::{
    ProjectConfig, SynapseConfig, CONFIG_FILE_NAME, GRAPH_FILE_NAME, STATE_DIR_NAME,
};
pub use engine::{ProjectEngine, SeedReport, SeedSource};
pub use error::{EngineError, Result};
pub use limits::{scan_concurrency, MAX_SCAN_CONCURRENCY};
pub use normalize::{DefaultRule, NormalizeRules};
pub use stats::RefreshStats;
pub use store::GraphStore;
pub use walker::{ProjectWalker, WalkConfig};

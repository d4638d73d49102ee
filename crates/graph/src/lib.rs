//! # Synapse Graph
//!
//! Architecture graph model, assembly, layout and structural analysis.
//!
//! ## Features
//!
//! - **Seeding** - nodes from a parsed specification or a file list, layered by path keywords
//! - **Volatile edges** - scan references resolved to nodes on every read, never persisted
//! - **Deterministic layout** - bounded rank propagation, pinned nodes stay put
//! - **Flow view** - reachable nodes ordered by layer and priority, START to END
//! - **Placement** - documentation shelf, storage cluster, one-shot collision resolution
//! - **Structural analysis** - cycles, bottlenecks, dead ends, completeness score
//!
//! ## Architecture
//!
//! ```text
//! ProjectStructure / file list
//!     │
//!     ├──> GraphBuilder ──> durable GraphSnapshot ──> GraphEditor (mutations)
//!     │
//!     ├──> GraphAssembler (on every read)
//!     │      ├─ drop dangling edges
//!     │      ├─ attach scan summaries, add proposed nodes
//!     │      ├─ derive volatile edges (ReferenceIndex)
//!     │      ├─ rank layout (depth bounded)
//!     │      └─ doc shelf / storage placement
//!     │
//!     └──> composite graph
//!            ├─ FlowExtractor ──> FlowView
//!            └─ StructuralAnalyzer ──> StructuralReport
//! ```
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use synapse_graph::{GraphAssembler, GraphBuilder, LayoutConfig, PlacementConfig};
//!
//! let builder = GraphBuilder::new(LayoutConfig::default()).unwrap();
//! let durable = builder.from_paths(["src/main.py", "src/db.py"]);
//!
//! let assembler = GraphAssembler::new(LayoutConfig::default(), PlacementConfig::default()).unwrap();
//! let composite = assembler.assemble(&durable, &HashMap::new(), &[]);
//! assert_eq!(composite.graph.nodes.len(), 2);
//! ```

mod analyzer;
mod assembler;
mod builder;
mod collision;
mod config;
mod derive;
mod error;
mod flow;
mod graph;
mod layers;
mod layout;
mod ops;
mod placement;
mod types;

pub use analyzer::{Finding, FindingKind, StructuralAnalyzer, StructuralReport};
pub use assembler::{AssemblyReport, CompositeGraph, GraphAssembler, ProposedFile};
pub use builder::GraphBuilder;
pub use collision::{
    clear_user_clusters, cluster_bounds, node_rect, resolve_collisions, CollisionGeometry,
};
pub use config::{AnalyzerConfig, FlowConfig, LayerRule, LayoutConfig, PlacementConfig};
pub use derive::{derive_edges, merge_volatile, ReferenceIndex};
pub use error::{GraphError, Result};
pub use flow::{FlowExtractor, FlowView, FlowViewStep};
pub use graph::GraphView;
pub use layers::classify;
pub use layout::{apply_rank_layout, compute_ranks};
pub use ops::{GraphEditor, Mutation};
pub use placement::{apply_placement, DOC_SHELF_ID, STORAGE_ID};
pub use types::{
    Approval, Cluster, ClusterRole, Edge, GraphSnapshot, Node, NodeKind, NodeStatus,
    SYNTHETIC_PREFIX,
};

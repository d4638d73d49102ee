use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use synapse_protocol::Position;

/// Path keywords that put a node on a layer with a priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRule {
    pub keywords: Vec<String>,
    pub layer: u8,
    pub priority: i32,
}

impl LayerRule {
    fn new(keywords: &[&str], layer: u8, priority: i32) -> Self {
        Self {
            keywords: strings(keywords),
            layer,
            priority,
        }
    }
}

/// Layer heuristics and grid geometry for seeding and rank layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// First matching rule wins
    pub layer_rules: Vec<LayerRule>,
    pub default_layer: u8,
    pub default_priority: i32,
    pub documentation_layer: u8,
    pub documentation_priority: i32,
    pub test_layer: u8,
    pub test_priority: i32,

    pub origin: Position,
    pub column_width: f64,
    pub row_height: f64,
    /// Columns of the insertion-order grid used for seeding
    pub grid_columns: usize,
    pub node_width: f64,
    pub node_height: f64,

    /// Upper bound on rank propagation passes
    pub max_rank_depth: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layer_rules: vec![
                LayerRule::new(
                    &["main", "index", "app", "scanner", "scan", "cli", "entry"],
                    0,
                    100,
                ),
                LayerRule::new(
                    &[
                        "router",
                        "prompt",
                        "engine",
                        "parser",
                        "service",
                        "controller",
                        "handler",
                    ],
                    1,
                    50,
                ),
                LayerRule::new(
                    &[
                        "db",
                        "storage",
                        "store",
                        "action",
                        "repository",
                        "model",
                        "persist",
                    ],
                    2,
                    20,
                ),
            ],
            default_layer: 1,
            default_priority: 0,
            documentation_layer: 0,
            documentation_priority: -100,
            test_layer: 2,
            test_priority: -50,
            origin: Position::new(0.0, 0.0),
            column_width: 240.0,
            row_height: 120.0,
            grid_columns: 6,
            node_width: 160.0,
            node_height: 60.0,
            max_rank_depth: 64,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_columns == 0 {
            return Err(GraphError::invalid_config("grid_columns must be at least 1"));
        }
        if self.max_rank_depth == 0 {
            return Err(GraphError::invalid_config("max_rank_depth must be at least 1"));
        }
        for (name, value) in [
            ("column_width", self.column_width),
            ("row_height", self.row_height),
            ("node_width", self.node_width),
            ("node_height", self.node_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GraphError::invalid_config(format!(
                    "{name} ({value}) must be a positive number"
                )));
            }
        }
        Ok(())
    }
}

/// Entry-point and decision conventions for the architecture flow view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// File stems that mark a flow root
    pub entry_names: Vec<String>,
    /// Stem substrings that mark a logical decision node
    pub decision_keywords: Vec<String>,
    pub column_width: f64,
    pub row_height: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            entry_names: default_entry_names(),
            decision_keywords: strings(&[
                "router", "decide", "check", "valid", "auth", "guard", "policy", "switch", "gate",
            ]),
            column_width: 240.0,
            row_height: 100.0,
        }
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.entry_names.iter().all(|name| name.trim().is_empty()) {
            return Err(GraphError::invalid_config("at least one entry name is required"));
        }
        if !(self.column_width > 0.0 && self.row_height > 0.0) {
            return Err(GraphError::invalid_config(
                "flow column_width and row_height must be positive",
            ));
        }
        Ok(())
    }
}

/// Thresholds and penalties of the structural analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub entry_names: Vec<String>,

    /// A node is a bottleneck when its in- or out-degree exceeds
    /// `max(min_bottleneck_degree, bottleneck_factor * mean degree)`
    pub min_bottleneck_degree: usize,
    pub bottleneck_factor: f64,

    /// Stems that may legitimately end a dependency chain
    pub terminal_keywords: Vec<String>,
    /// Node kinds left out of dead-end and reachability checks
    pub ignored_kinds: Vec<String>,

    pub cycle_penalty: u32,
    pub unreachable_penalty: u32,
    pub bottleneck_penalty: u32,
    pub dead_end_penalty: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            entry_names: default_entry_names(),
            min_bottleneck_degree: 3,
            bottleneck_factor: 2.0,
            terminal_keywords: strings(&[
                "db",
                "storage",
                "store",
                "model",
                "models",
                "schema",
                "types",
                "config",
                "constants",
                "util",
                "utils",
                "helpers",
            ]),
            ignored_kinds: strings(&["documentation", "config"]),
            cycle_penalty: 15,
            unreachable_penalty: 10,
            bottleneck_penalty: 5,
            dead_end_penalty: 5,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.bottleneck_factor.is_finite() && self.bottleneck_factor > 0.0) {
            return Err(GraphError::invalid_config(format!(
                "bottleneck_factor ({}) must be a positive number",
                self.bottleneck_factor
            )));
        }
        Ok(())
    }
}

/// Automatic shelves and collision spacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub doc_shelf: bool,
    pub doc_shelf_origin: Position,
    pub storage_shelf: bool,
    /// Vertical gap between the main layout and the storage row
    pub storage_gap: f64,
    pub shelf_spacing: f64,

    /// Added around a cluster's bounding box before intersection tests
    pub collision_padding: f64,
    /// Distance below the cluster an intruder is moved to
    pub collision_margin: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            doc_shelf: true,
            doc_shelf_origin: Position::new(-320.0, 0.0),
            storage_shelf: true,
            storage_gap: 160.0,
            shelf_spacing: 80.0,
            collision_padding: 20.0,
            collision_margin: 40.0,
        }
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<()> {
        if self.collision_padding < 0.0 || self.collision_margin <= 0.0 {
            return Err(GraphError::invalid_config(
                "collision_padding must be >= 0 and collision_margin > 0",
            ));
        }
        if self.shelf_spacing <= 0.0 {
            return Err(GraphError::invalid_config("shelf_spacing must be positive"));
        }
        Ok(())
    }
}

fn default_entry_names() -> Vec<String> {
    strings(&["main", "index", "app", "server", "cli", "__main__", "lib"])
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(LayoutConfig::default().validate().is_ok());
        assert!(FlowConfig::default().validate().is_ok());
        assert!(AnalyzerConfig::default().validate().is_ok());
        assert!(PlacementConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_values() {
        let layout = LayoutConfig {
            grid_columns: 0,
            ..Default::default()
        };
        assert!(layout.validate().is_err());

        let analyzer = AnalyzerConfig {
            bottleneck_factor: f64::NAN,
            ..Default::default()
        };
        assert!(analyzer.validate().is_err());

        let flow = FlowConfig {
            entry_names: vec![],
            ..Default::default()
        };
        assert!(flow.validate().is_err());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let layout: LayoutConfig = serde_json::from_str(r#"{"grid_columns": 3}"#).unwrap();
        assert_eq!(layout.grid_columns, 3);
        assert_eq!(layout.layer_rules.len(), 3);
    }
}

//! Shared vocabulary for the Synapse crates: file roles, relation kinds and
//! the 2D geometry used by the layout engine and the renderer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub mod path_filters;

/// Version stamped into every persisted graph snapshot.
pub const GRAPH_SCHEMA_VERSION: u32 = 1;

/// Coarse role of a project file, derived from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Source,
    Config,
    Documentation,
    Test,
}

impl FileKind {
    /// Classify a path by directory convention, file name and extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let lowered = path.to_string_lossy().replace('\\', "/").to_lowercase();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if DOC_EXTENSIONS.contains(&ext.as_str())
            || DOC_FILE_STEMS
                .iter()
                .any(|stem| file_name == *stem || file_name.starts_with(&format!("{stem}.")))
        {
            return FileKind::Documentation;
        }

        let in_test_dir = lowered
            .split('/')
            .rev()
            .skip(1)
            .any(|component| matches!(component, "test" | "tests" | "__tests__" | "spec"));
        if in_test_dir
            || file_name.starts_with("test_")
            || file_name.contains("_test.")
            || file_name.contains(".test.")
            || file_name.contains(".spec.")
        {
            return FileKind::Test;
        }

        if CONFIG_EXTENSIONS.contains(&ext.as_str())
            || matches!(file_name.as_str(), "dockerfile" | "makefile" | "justfile")
        {
            return FileKind::Config;
        }

        FileKind::Source
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Source => "source",
            FileKind::Config => "config",
            FileKind::Documentation => "documentation",
            FileKind::Test => "test",
        }
    }
}

const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "rst", "adoc", "txt"];
const DOC_FILE_STEMS: &[&str] = &["readme", "license", "changelog", "contributing"];
const CONFIG_EXTENSIONS: &[&str] = &[
    "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "xml", "lock", "properties",
];

/// Kind of a directed relation between two graph entities.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    #[default]
    Dependency,
    Call,
    DataFlow,
    Conditional,
    Origin,
    Event,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Dependency => "dependency",
            RelationKind::Call => "call",
            RelationKind::DataFlow => "data_flow",
            RelationKind::Conditional => "conditional",
            RelationKind::Origin => "origin",
            RelationKind::Event => "event",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts canonical names plus the verbs people write in architecture notes
/// ("calls", "imports", "emits", ...).
impl FromStr for RelationKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "dependency" | "depends" | "depends_on" | "imports" | "import" | "uses" | "use"
            | "requires" => Ok(RelationKind::Dependency),
            "call" | "calls" | "invokes" => Ok(RelationKind::Call),
            "data_flow" | "dataflow" | "data" | "flow" | "reads" | "writes" | "feeds" => {
                Ok(RelationKind::DataFlow)
            }
            "conditional" | "if" | "when" => Ok(RelationKind::Conditional),
            "origin" | "creates" | "spawns" => Ok(RelationKind::Origin),
            "event" | "emits" | "triggers" | "notifies" => Ok(RelationKind::Event),
            _ => Err(format!("unknown relation kind: {raw}")),
        }
    }
}

/// A point in layout space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// An axis-aligned rectangle in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn at(origin: Position, width: f64, height: f64) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Strict overlap: rectangles that only share an edge do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Grow the rectangle by `padding` on every side.
    #[must_use]
    pub fn expand(&self, padding: f64) -> Self {
        Self {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + padding * 2.0,
            height: self.height + padding * 2.0,
        }
    }

    /// Expand to include another rect, returning the bounding union.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_files_by_role() {
        assert_eq!(FileKind::from_path("src/login.py"), FileKind::Source);
        assert_eq!(FileKind::from_path("README.md"), FileKind::Documentation);
        assert_eq!(FileKind::from_path("docs/guide.rst"), FileKind::Documentation);
        assert_eq!(FileKind::from_path("Cargo.toml"), FileKind::Config);
        assert_eq!(FileKind::from_path("tests/test_login.py"), FileKind::Test);
        assert_eq!(FileKind::from_path("src/board.test.ts"), FileKind::Test);
        assert_eq!(FileKind::from_path("src/tests.rs"), FileKind::Source);
    }

    #[test]
    fn parses_relation_verbs() {
        assert_eq!("calls".parse::<RelationKind>(), Ok(RelationKind::Call));
        assert_eq!("data-flow".parse::<RelationKind>(), Ok(RelationKind::DataFlow));
        assert_eq!("Depends on".parse::<RelationKind>(), Ok(RelationKind::Dependency));
        assert_eq!("emits".parse::<RelationKind>(), Ok(RelationKind::Event));
        assert!("teleports".parse::<RelationKind>().is_err());
    }

    #[test]
    fn relation_kind_serializes_snake_case() {
        let raw = serde_json::to_string(&RelationKind::DataFlow).unwrap();
        assert_eq!(raw, "\"data_flow\"");
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::at(Position::new(0.0, 0.0), 10.0, 10.0);
        let b = Rect::at(Position::new(10.0, 0.0), 10.0, 10.0);
        let c = Rect::at(Position::new(5.0, 5.0), 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(a.expand(1.0).intersects(&b));
    }

    #[test]
    fn union_covers_both() {
        let a = Rect::at(Position::new(0.0, 0.0), 10.0, 10.0);
        let b = Rect::at(Position::new(20.0, 30.0), 5.0, 5.0);
        let u = a.union(&b);
        assert_eq!(u.right(), 25.0);
        assert_eq!(u.bottom(), 35.0);
    }
}

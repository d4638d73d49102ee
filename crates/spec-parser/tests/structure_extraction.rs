use pretty_assertions::assert_eq;
use synapse_protocol::{FileKind, RelationKind};
use synapse_spec_parser::{ParserRules, ProjectStructure, SpecParser};

fn parse(doc: &str) -> ProjectStructure {
    SpecParser::new(ParserRules::default())
        .expect("default rules are valid")
        .parse(doc)
}

#[test]
fn fenced_examples_are_not_entries() {
    let doc = r#"# Synapse demo

Example of the expected layout, for illustration only:

```text
📄 example/fake.py
- example/other.py
```

📄 src/login.py
"#;
    let structure = parse(doc);
    assert_eq!(structure.paths().collect::<Vec<_>>(), vec!["src/login.py"]);
    assert!(structure.folders.is_empty());
}

#[test]
fn comments_and_inline_code_are_ignored() {
    let doc = "<!--\n📄 hidden/draft.py\n-->\n- Call `helpers.py` from anywhere\n- src/board.py <!-- inline note.py -->\n~~~\n📄 fenced.py\n";
    let structure = parse(doc);
    assert_eq!(structure.paths().collect::<Vec<_>>(), vec!["src/board.py"]);
}

#[test]
fn full_document() {
    let doc = r#"# Architecture

Scope: src, docs

## Folders
📁 src/
📂 docs/

## Files
- 📄 src/main.py — entry point
- 📄 src/router.py — request routing
- 📄 src/db/storage.py — persistence
- 📝 docs/guide.md
- 📄 tests/test_router.py

## Flow
- src/main.py -> src/router.py (calls)
- src/router.py -> src/db/storage.py (data-flow)
- src/router.py emits src/events.py
"#;
    let structure = parse(doc);

    assert_eq!(structure.scope, vec!["src", "docs"]);
    assert_eq!(structure.folders, vec!["src", "docs"]);
    assert_eq!(
        structure.paths().collect::<Vec<_>>(),
        vec![
            "src/main.py",
            "src/router.py",
            "src/db/storage.py",
            "docs/guide.md",
            "tests/test_router.py",
        ]
    );
    assert_eq!(
        structure.file("docs/guide.md").map(|f| f.kind),
        Some(FileKind::Documentation)
    );
    assert_eq!(
        structure.file("tests/test_router.py").map(|f| f.kind),
        Some(FileKind::Test)
    );
    assert_eq!(
        structure.file("src/main.py").and_then(|f| f.description.as_deref()),
        Some("entry point")
    );

    let kinds: Vec<(&str, &str, RelationKind)> = structure
        .dependencies
        .iter()
        .map(|d| (d.source.as_str(), d.target.as_str(), d.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("src/main.py", "src/router.py", RelationKind::Call),
            ("src/router.py", "src/db/storage.py", RelationKind::DataFlow),
            ("src/router.py", "src/events.py", RelationKind::Event),
        ]
    );
}

#[test]
fn empty_document_signals_fallback() {
    assert!(parse("").is_empty());
    assert!(parse("Just some prose about the project.\n").is_empty());
}

#[test]
fn unreadable_document_is_empty() {
    let temp = tempfile::tempdir().unwrap();
    let parser = SpecParser::new(ParserRules::default()).unwrap();
    assert!(parser.parse_file(temp.path().join("SPEC.md")).is_empty());

    let path = temp.path().join("SPEC.md");
    std::fs::write(&path, "📄 app/main.rs\n").unwrap();
    assert_eq!(
        parser.parse_file(&path).paths().collect::<Vec<_>>(),
        vec!["app/main.rs"]
    );
}

#[test]
fn structure_serializes_compactly() {
    let structure = parse("📄 src/a.py\n");
    let json = serde_json::to_value(&structure).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "files": [{ "path": "src/a.py", "kind": "source" }] })
    );
}

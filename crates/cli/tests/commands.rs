use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn run_cli_raw(workdir: &Path, args: &[&str]) -> (bool, Vec<u8>) {
    let output = Command::cargo_bin("synapse")
        .expect("binary")
        .current_dir(workdir)
        .env_remove("RUST_LOG")
        .arg("--quiet")
        .args(args)
        .output()
        .expect("command run");
    (output.status.success(), output.stdout)
}

fn run_cli(workdir: &Path, args: &[&str]) -> Value {
    let (ok, stdout) = run_cli_raw(workdir, args);
    assert!(ok, "synapse {args:?} failed: {}", String::from_utf8_lossy(&stdout));
    serde_json::from_slice(&stdout).expect("valid json")
}

fn setup_project() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(
        root.join("spec.md"),
        "# Service\n\n- 📄 src/main.py\n- 📄 src/db.py\n- 📄 src/later.py\n",
    )
    .unwrap();
    fs::write(
        root.join("src/main.py"),
        "import db\n\ndef main(x):\n    if x:\n        db.save(x)\n    else:\n        print(x)\n",
    )
    .unwrap();
    fs::write(root.join("src/db.py"), "def save(x):\n    return x\n").unwrap();
    temp
}

#[test]
fn seed_then_state_reports_derived_edges() {
    let temp = setup_project();
    let root = temp.path();

    let seed = run_cli(root, &["seed"]);
    assert_eq!(seed["source"], "specification");
    assert_eq!(seed["nodes_added"], 2);
    assert_eq!(seed["proposed"][0], "src/later.py");
    assert!(root.join(".synapse/graph.json").exists());

    let state = run_cli(root, &["state", "--stats"]);
    assert_eq!(state["stats"]["files_scanned"], 2);
    let edges = state["state"]["edges"].as_array().unwrap();
    assert!(edges
        .iter()
        .any(|edge| edge["id"] == "auto:src/main.py->src/db.py"));
}

#[test]
fn scan_and_flow_work_on_single_files() {
    let temp = setup_project();
    let root = temp.path();

    let summary = run_cli(root, &["scan", "src/main.py"]);
    assert_eq!(summary["references"][0], "db");

    let flow = run_cli(root, &["flow", "src/main.py"]);
    let steps = flow["steps"].as_array().unwrap();
    assert!(steps.iter().any(|step| step["kind"] == "decision"));

    let project_flow = run_cli(root, &["flow"]);
    assert_eq!(project_flow["name"], "architecture");
}

#[test]
fn apply_persists_and_rejects_bad_mutations() {
    let temp = setup_project();
    let root = temp.path();
    run_cli(root, &["seed"]);

    let graph = run_cli(
        root,
        &[
            "apply",
            "--json",
            r#"{"op":"create_edge","source":"src/main.py","target":"src/db.py","kind":"call"}"#,
        ],
    );
    assert_eq!(graph["edges"][0]["id"], "src/main.py->src/db.py#call");

    let (ok, _) = run_cli_raw(
        root,
        &["apply", "--json", r#"{"op":"delete_node","id":"src/ghost.py"}"#],
    );
    assert!(!ok);

    let (ok, _) = run_cli_raw(root, &["apply", "--json", "not json"]);
    assert!(!ok);
}

#[test]
fn parse_spec_and_analyze_emit_json() {
    let temp = setup_project();
    let root = temp.path();

    let structure = run_cli(root, &["parse-spec", "spec.md"]);
    assert_eq!(structure["files"].as_array().unwrap().len(), 3);

    let report = run_cli(root, &["--compact", "analyze"]);
    let score = report["score"].as_u64().unwrap();
    assert!(score <= 100);
}

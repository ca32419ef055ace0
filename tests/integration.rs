use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn insight_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("insight");
    path
}

/// A port nothing listens on, so model calls fail fast with "connection refused".
fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn setup_test_env(on_model_error: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/db/insight.db"

[server]
bind = "127.0.0.1:5000"

[ollama]
url = "http://127.0.0.1:{}"
timeout_secs = 5

[analysis]
on_model_error = "{}"
"#,
        root.display(),
        dead_port(),
        on_model_error
    );

    let config_path = config_dir.join("insight.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_insight(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = insight_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run insight binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env("error");

    let (stdout, stderr, success) = run_insight(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("db/insight.db").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("error");

    let (_, _, success1) = run_insight(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_insight(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_empty_history_and_export() {
    let (_tmp, config_path) = setup_test_env("error");
    run_insight(&config_path, &["init"]);

    let (stdout, _, success) = run_insight(&config_path, &["history"]);
    assert!(success);
    assert!(stdout.contains("No analyses stored."));

    let (stdout, _, success) = run_insight(&config_path, &["export"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn test_read_commands_work_without_init() {
    let (_tmp, config_path) = setup_test_env("error");

    let (stdout, stderr, success) = run_insight(&config_path, &["history"]);
    assert!(success, "history failed: {}", stderr);
    assert!(stdout.contains("No analyses stored."));

    let (stdout, stderr, success) = run_insight(&config_path, &["export"]);
    assert!(success, "export failed: {}", stderr);
    let parsed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(parsed, serde_json::json!([]));

    let (stdout, stderr, success) = run_insight(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Analyses:    0"));

    let (_, stderr, success) = run_insight(&config_path, &["show", "1"]);
    assert!(!success);
    assert!(stderr.contains("analysis not found: 1"));
    assert!(!stderr.contains("no such table"));
}

#[test]
fn test_analyze_fails_when_model_unreachable() {
    let (_tmp, config_path) = setup_test_env("error");
    run_insight(&config_path, &["init"]);

    let (stdout, stderr, success) = run_insight(
        &config_path,
        &["analyze", "Grace Hopper wrote the first compiler."],
    );
    assert!(!success, "analyze should fail: stdout={}", stdout);
    assert!(
        stderr.contains("unreachable"),
        "expected unreachable error, got: {}",
        stderr
    );

    // Nothing stored
    let (stdout, _, _) = run_insight(&config_path, &["export"]);
    let parsed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 0);
}

#[test]
fn test_analyze_fallback_mode_stores_row() {
    let (tmp, config_path) = setup_test_env("fallback");
    run_insight(&config_path, &["init"]);

    let article = tmp.path().join("article.txt");
    fs::write(&article, "  Grace Hopper wrote the first compiler.\n").unwrap();

    let (stdout, stderr, success) = run_insight(
        &config_path,
        &["analyze", "--file", article.to_str().unwrap()],
    );
    assert!(success, "analyze failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("--- Analysis 1 ---"));
    assert!(stdout.contains("No summary, error"));

    let (stdout, _, success) = run_insight(&config_path, &["export"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], 1);
    assert_eq!(
        rows[0]["original_text"],
        "Grace Hopper wrote the first compiler."
    );
    assert_eq!(rows[0]["summary"], "No summary, error");
    assert_eq!(rows[0]["persons"], "No people, error");
    assert_eq!(rows[0]["category"], "Other");

    let (stdout, _, success) = run_insight(&config_path, &["show", "1"]);
    assert!(success);
    assert!(stdout.contains("Grace Hopper wrote the first compiler."));

    let (stdout, _, success) = run_insight(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Analyses:    1"));
    assert!(stdout.contains("Other"));
}

#[test]
fn test_export_to_file() {
    let (tmp, config_path) = setup_test_env("fallback");
    run_insight(&config_path, &["init"]);
    run_insight(&config_path, &["analyze", "First text."]);
    run_insight(&config_path, &["analyze", "Second text."]);

    let out = tmp.path().join("exports/all.json");
    let (_, stderr, success) =
        run_insight(&config_path, &["export", "--output", out.to_str().unwrap()]);
    assert!(success, "export failed: {}", stderr);
    assert!(stderr.contains("Exported 2 analyses"));

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["original_text"], "First text.");
    assert_eq!(rows[1]["original_text"], "Second text.");
}

#[test]
fn test_show_missing_id_fails() {
    let (_tmp, config_path) = setup_test_env("error");
    run_insight(&config_path, &["init"]);

    let (_, stderr, success) = run_insight(&config_path, &["show", "99"]);
    assert!(!success);
    assert!(stderr.contains("analysis not found: 99"));
}

#[test]
fn test_empty_text_rejected() {
    let (_tmp, config_path) = setup_test_env("fallback");
    run_insight(&config_path, &["init"]);

    let (_, stderr, success) = run_insight(&config_path, &["analyze", "   "]);
    assert!(!success);
    assert!(stderr.contains("text must not be empty"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        "[db]\npath = \"x.db\"\n\n[server]\nbind = \"127.0.0.1:5000\"\n\n[ollama]\ntimeout_secs = 0\n",
    )
    .unwrap();

    let (_, stderr, success) = run_insight(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("timeout_secs"));
}

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let db_path = dir.join("cli.db");
    let config_path = dir.join("config.toml");
    fs::write(
        &config_path,
        format!(
            "[database]\ndriver = \"sqlite\"\ndb_name = {:?}\nhost = \"localhost\"\n",
            db_path.to_string_lossy()
        ),
    )
    .unwrap();
    config_path
}

fn sqlgate(config: &Path, kind: &str, sql: &str) -> assert_cmd::assert::Assert {
    Command::cargo_bin("sqlgate")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config)
        .arg(kind)
        .arg(sql)
        .assert()
}

#[test]
fn test_cli_runs_classified_queries() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    // The CLI has no DDL verb.
    rusqlite::Connection::open(dir.path().join("cli.db"))
        .unwrap()
        .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
        .unwrap();

    sqlgate(&config, "insert", "INSERT INTO notes (body) VALUES ('hello')").success();

    let output = sqlgate(&config, "select", "SELECT id, body FROM notes")
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["id"], 1);
    assert_eq!(json["body"], "hello");

    let output = sqlgate(&config, "delete", "DELETE FROM notes RETURNING id")
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json, serde_json::json!([{ "id": 1 }]));
}

#[test]
fn test_cli_rejects_mismatched_verb() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let assert = sqlgate(&config, "select", "DELETE FROM notes").failure().code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("expected a select statement"), "{}", stderr);
}

#[test]
fn test_cli_usage_error() {
    Command::cargo_bin("sqlgate")
        .unwrap()
        .arg("select")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_cli_missing_config_file() {
    let dir = TempDir::new().unwrap();
    sqlgate(&dir.path().join("absent.toml"), "select", "SELECT 1")
        .failure()
        .code(1);
}

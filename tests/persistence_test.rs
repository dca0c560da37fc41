#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

fn run(script_lines: &[&str], db_path: &std::path::Path) -> String {
    let mut script = tempfile::NamedTempFile::new().unwrap();
    for line in script_lines {
        writeln!(script, "{line}").unwrap();
    }
    let output = Command::new(cargo_bin!("arena-ledger"))
        .arg(script.path())
        .arg("--fixtures")
        .arg("tests/fixtures/fixtures.json")
        .arg("--db-path")
        .arg(db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: create an order under an idempotency key
    let order = r#"{"token": "alice", "command": "create_order", "item": "FF-2000", "recipient": "123456789", "idempotency_key": "persisted"}"#;
    let first = run(&[order], &db_path);
    let code = first
        .lines()
        .find(|l| l.starts_with("1,create_order,ok"))
        .and_then(|l| l.split(',').nth(4))
        .unwrap()
        .to_string();

    // 2. Second run: the key replays the stored order and the listing sees it
    let list = r#"{"token": "alice", "command": "my_orders"}"#;
    let second = run(&[order, list], &db_path);
    assert!(second.contains(&format!("1,create_order,ok,order,{code},pending")));
    assert!(second.contains(&format!("2,my_orders,ok,order,,1,{code}")));
}

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

const FIXTURES: &str = "tests/fixtures/fixtures.json";

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/scenario.jsonl")
        .arg("--fixtures")
        .arg(FIXTURES);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "line,command,outcome,entity,id,status,detail",
        ))
        .stdout(predicate::str::contains("1,create_order,ok,order,FF"))
        .stdout(predicate::str::contains("2,create_order,ok,order,FF"))
        .stdout(predicate::str::contains("3,create_order,unavailable,"))
        .stdout(predicate::str::contains("4,initiate_checkout,ok,payment,PAY-"))
        .stdout(predicate::str::contains(",image/png,41 bytes"))
        .stdout(predicate::str::contains("6,validate_payment,forbidden,"))
        .stdout(predicate::str::contains(",validated,2000 XOF via mtn_momo"))
        .stdout(predicate::str::contains("8,deliver_order,ok,order,FF"))
        .stdout(predicate::str::contains(",delivered,2000 XOF"))
        .stdout(predicate::str::contains("9,deliver_order,conflict,"))
        .stdout(predicate::str::contains(",en_examen,Friday Night Cup"))
        .stdout(predicate::str::contains(",valide,Friday Night Cup"))
        .stdout(predicate::str::contains("12,register,forbidden,"))
        .stdout(predicate::str::contains("13,register,ok,registration,"))
        .stdout(predicate::str::contains("14,register,conflict,"))
        .stdout(predicate::str::contains("15,stats,ok,stats"));

    Ok(())
}

#[test]
fn test_idempotent_replay_reuses_order_code() {
    let output = Command::new(cargo_bin!())
        .arg("tests/fixtures/scenario.jsonl")
        .arg("--fixtures")
        .arg(FIXTURES)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let codes: Vec<&str> = stdout
        .lines()
        .filter(|line| line.starts_with("1,create_order,") || line.starts_with("2,create_order,"))
        .map(|line| line.split(',').nth(4).unwrap())
        .collect();
    assert_eq!(codes.len(), 2);
    assert_eq!(codes[0], codes[1]);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let mut script = NamedTempFile::new().unwrap();
    writeln!(
        script,
        r#"{{"token": "alice", "command": "create_order", "item": "FF-2000", "recipient": "123456789"}}"#
    )
    .unwrap();
    writeln!(script, "not json at all").unwrap();
    writeln!(script, r#"{{"token": "alice", "command": "teleport"}}"#).unwrap();
    writeln!(script, r#"{{"token": "alice", "command": "my_orders"}}"#).unwrap();

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(script.path()).arg("--fixtures").arg(FIXTURES);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading command on line 2"))
        .stderr(predicate::str::contains("Error reading command on line 3"))
        .stdout(predicate::str::contains("1,create_order,ok,order,FF"))
        .stdout(predicate::str::contains("4,my_orders,ok,order,,1,FF"));
}

#[test]
fn test_unknown_token_and_labels_are_reported() {
    let mut script = NamedTempFile::new().unwrap();
    writeln!(
        script,
        r#"{{"token": "mallory", "command": "create_order", "item": "FF-2000", "recipient": "123456789"}}"#
    )
    .unwrap();
    writeln!(
        script,
        r#"{{"token": "root", "command": "validate_payment", "payment": "nope"}}"#
    )
    .unwrap();
    writeln!(
        script,
        r#"{{"token": "alice", "command": "create_order", "item": "FF-9999", "recipient": "123456789"}}"#
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(script.path()).arg("--fixtures").arg(FIXTURES);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,create_order,unauthenticated,"))
        .stdout(predicate::str::contains("2,validate_payment,not_found,"))
        .stdout(predicate::str::contains("3,create_order,not_found,"));
}

#[test]
fn test_proof_files_land_in_blob_dir() {
    let blobs = tempfile::tempdir().unwrap();

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/scenario.jsonl")
        .arg("--fixtures")
        .arg(FIXTURES)
        .arg("--blob-dir")
        .arg(blobs.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("5,submit_proof,ok,proof,"));

    let stored: Vec<_> = std::fs::read_dir(blobs.path())
        .unwrap()
        .flat_map(|shard| std::fs::read_dir(shard.unwrap().path()).unwrap())
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        std::fs::read(&stored[0]).unwrap(),
        std::fs::read("tests/fixtures/receipt.png").unwrap()
    );
}

#[test]
fn test_proof_size_limit_flag() {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/scenario.jsonl")
        .arg("--fixtures")
        .arg(FIXTURES)
        .arg("--max-proof-bytes")
        .arg("16");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("5,submit_proof,invalid_input,"));
}

#[test]
fn test_team_registration_and_participant_listing() {
    let mut script = NamedTempFile::new().unwrap();
    writeln!(
        script,
        r#"{{"token": "olga", "label": "duo", "command": "create_tournament", "title": "Duo Clash", "visibility": "public", "mode": "BR_DUO", "start_at": "2099-01-01T18:00:00Z", "description": "Weekly duo ladder", "prize_pool": "25000"}}"#
    )
    .unwrap();
    writeln!(
        script,
        r#"{{"token": "root", "command": "approve_tournament", "tournament": "duo"}}"#
    )
    .unwrap();
    writeln!(
        script,
        r#"{{"token": "bob", "command": "register", "tournament": "duo", "team_name": "Night Owls", "team_members": ["Bob", "Kira"]}}"#
    )
    .unwrap();
    writeln!(
        script,
        r#"{{"token": "alice", "command": "register", "tournament": "duo", "team_name": "Crowd", "team_members": ["a", "b", "c"]}}"#
    )
    .unwrap();
    writeln!(script, r#"{{"token": "alice", "command": "list_tournaments"}}"#).unwrap();

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(script.path()).arg("--fixtures").arg(FIXTURES);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("team Night Owls"))
        .stdout(predicate::str::contains("4,register,invalid_input,"))
        .stdout(predicate::str::contains("5,list_tournaments,ok,tournament,,1,Duo Clash (1)"));
}

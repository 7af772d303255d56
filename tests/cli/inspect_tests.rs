use crate::common::emu_dispatch;
use predicates::prelude::*;

#[test]
fn inspect_lists_functions() {
    emu_dispatch()
        .args(["inspect", "Counter"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Counter"))
        .stdout(predicate::str::contains("0x7cf5dab0"))
        .stdout(predicate::str::contains("increment(uint256)"))
        .stdout(predicate::str::contains("payable"))
        .stdout(predicate::str::contains("snapshot()"));
}

#[test]
fn inspect_json_is_machine_readable() {
    let output = emu_dispatch()
        .args(["inspect", "Counter", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["contract"], "Counter");
    let functions = summary["functions"].as_array().unwrap();
    assert_eq!(functions.len(), 11);

    let deposit = functions
        .iter()
        .find(|f| f["name"] == "deposit")
        .unwrap();
    assert_eq!(deposit["mutability"], "mutating");
    assert_eq!(deposit["payable"], true);

    let add = functions.iter().find(|f| f["name"] == "add").unwrap();
    assert_eq!(add["selector"], "0x771602f7");
    assert_eq!(add["mutability"], "view");
}

#[test]
fn artifacts_dir_can_come_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("emulator-dispatch.toml");
    std::fs::write(
        &config,
        format!(
            "[artifacts]\ndir = {:?}\n",
            crate::common::fixtures().display().to_string()
        ),
    )
    .unwrap();

    let mut cmd = assert_cmd::Command::cargo_bin("emu-dispatch").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("EMULATOR_DISPATCH_ARTIFACTS")
        .args(["--config"])
        .arg(&config)
        .args(["inspect", "Counter"])
        .assert()
        .success()
        .stdout(predicate::str::contains("increment_count()"));
}

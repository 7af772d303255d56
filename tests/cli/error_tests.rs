use crate::common::emu_dispatch;
use predicates::prelude::*;

#[test]
fn missing_contract() {
    emu_dispatch()
        .args(["inspect", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nope"));
}

#[test]
fn unknown_function() {
    emu_dispatch()
        .args(["encode", "Counter", "decrement"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("decrement"));
}

#[test]
fn wrong_argument_type() {
    emu_dispatch()
        .args(["encode", "Counter", "increment", "--args", r#"["five"]"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not encode Counter.increment"));
}

#[test]
fn control_keywords_are_not_contract_arguments() {
    emu_dispatch()
        .args(["encode", "Counter", "increment", "--args", r#"{"caller": "0x0a"}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("control parameter"));
}

#[test]
fn decode_rejects_bad_hex() {
    emu_dispatch()
        .args(["decode", "Counter", "increment_count", "0xnothex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid hex"));
}

#[test]
fn decode_rejects_empty_data() {
    emu_dispatch()
        .args(["decode", "Counter", "increment_count", "0x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty return data"));
}

#[test]
fn bad_timeout_env_is_reported() {
    emu_dispatch()
        .env("EMULATOR_DISPATCH_TIMEOUT_SECS", "soon")
        .args(["inspect", "Counter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("EMULATOR_DISPATCH_TIMEOUT_SECS"));
}

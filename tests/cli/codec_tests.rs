use crate::common::{emu_dispatch, word};
use predicates::prelude::*;

#[test]
fn encode_positional_args() {
    emu_dispatch()
        .args(["encode", "Counter", "increment", "--args", "[5]"])
        .assert()
        .success()
        .stdout(format!("0x7cf5dab0{}\n", word(5)));
}

#[test]
fn encode_named_args_and_strings() {
    emu_dispatch()
        .args(["encode", "Counter", "add", "--args", r#"{"b": "0x10", "a": 1}"#])
        .assert()
        .success()
        .stdout(format!("0x771602f7{}{}\n", word(1), word(16)));
}

#[test]
fn encode_without_args() {
    emu_dispatch()
        .args(["encode", "Counter", "increment_count"])
        .assert()
        .success()
        .stdout("0xe669de85\n");
}

#[test]
fn decode_single_output() {
    emu_dispatch()
        .args(["decode", "Counter", "increment_count", &format!("0x{}", word(42))])
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn decode_tuple_output() {
    let data = format!("{}{}", word(0xa), word(5));
    emu_dispatch()
        .args(["decode", "Counter", "snapshot", &data])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "(0x000000000000000000000000000000000000000A, 5)",
        ));
}

#[test]
fn decode_accepts_a_signature() {
    emu_dispatch()
        .args(["decode", "Counter", "add(uint256,uint256)", &word(42)])
        .assert()
        .success()
        .stdout("42\n");
}

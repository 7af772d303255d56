use assert_cmd::Command;
use std::path::PathBuf;

pub fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/artifacts")
}

/// `emu-dispatch` pointed at the fixture artifacts, with colour and
/// environment overrides disabled.
pub fn emu_dispatch() -> Command {
    let mut cmd = Command::cargo_bin("emu-dispatch").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("EMULATOR_DISPATCH_CONFIG")
        .env_remove("EMULATOR_DISPATCH_ARTIFACTS")
        .env_remove("EMULATOR_DISPATCH_TIMEOUT_SECS")
        .arg("--artifacts")
        .arg(fixtures());
    cmd
}

/// ABI word holding `n`, as lowercase hex.
pub fn word(n: u64) -> String {
    format!("{n:064x}")
}

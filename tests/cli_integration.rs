/// End-to-end CLI integration tests
#[path = "cli/common.rs"]
mod common;
#[path = "cli/error_tests.rs"]
mod error_tests;
#[path = "cli/inspect_tests.rs"]
mod inspect_tests;
#[path = "cli/codec_tests.rs"]
mod codec_tests;

// lib.rs - Library crate behind the `railstest` binary
//
// Exposes the modules so integration tests and benchmarks can use them.

pub mod cli;
pub mod method_locator;
pub mod orchestrator;
pub mod pairing;
pub mod perf;
pub mod runner;
pub mod settings;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

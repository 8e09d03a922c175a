//
// test_utils/mod.rs
//
// Shared helpers for unit tests, integration tests and benchmarks
//

pub mod fixture_workspace;
pub mod recording;

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use function_parser::{Ast, Forest};
use tracing_subscriber::EnvFilter;

/// Routes library tracing into the test output. Set `RUST_LOG=function_parser=trace`
/// to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The prefix form of every tree, in order.
pub fn pretty(forest: &Forest) -> Vec<String> {
    forest.iter().map(Ast::to_string).collect()
}

//! # Debugging and Logging Utilities
//!
//! Conditional logging, JSON introspection dumps, and simple performance
//! measurement for the compiler pipeline, gated by environment variables.

use crate::ast::nodes::Program;
use crate::compiler::lexer::Token;
use std::time::Instant;

/// Debug dumps are enabled when `VYLC_DEBUG` is set.
pub fn is_debug_enabled() -> bool {
    std::env::var("VYLC_DEBUG").is_ok()
}

/// Phase timing is printed when `VYLC_VERBOSE` is set.
pub fn is_perf_enabled() -> bool {
    std::env::var("VYLC_VERBOSE").is_ok()
}

/// Dumps the token stream as JSON when debugging is enabled.
pub fn dump_tokens(tokens: &[Token]) {
    if is_debug_enabled() {
        if let Ok(json) = serde_json::to_string_pretty(tokens) {
            println!("TOKENS: {}", json);
        }
    }
}

/// Dumps the AST as JSON when debugging is enabled.
pub fn dump_ast(program: &Program) {
    if is_debug_enabled() {
        if let Ok(json) = serde_json::to_string_pretty(program) {
            println!("AST: {}", json);
        }
    }
}

/// A simple timer for phase durations.
///
/// Usage: `let timer = PerfTimer::new("parse"); ... timer.finish();`
pub struct PerfTimer {
    start: Instant,
    label: String,
}

impl PerfTimer {
    pub fn new(label: &str) -> Self {
        Self {
            start: Instant::now(),
            label: label.to_string(),
        }
    }

    /// Stops the timer and prints the elapsed duration if performance
    /// tracking is active.
    pub fn finish(self) {
        if is_perf_enabled() {
            println!("{}: {:?}", self.label, self.start.elapsed());
        }
    }
}

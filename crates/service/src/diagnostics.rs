//! Fire-and-forget reporting of rejected calls and swallowed failures.
//!
//! The database never propagates these conditions to its callers; it hands
//! them to a sink instead. The default sink forwards to `tracing`.

use std::error::Error;

use tracing::{error, warn};

pub trait DiagnosticSink: Send + Sync {
    /// A public operation was called with an empty or missing argument.
    fn invalid_argument(&self, name: &str);

    /// An operation failed and was skipped.
    fn exception(&self, context: &str, error: &(dyn Error + 'static));
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn invalid_argument(&self, name: &str) {
        warn!(argument = name, "rejected call with empty argument");
    }

    fn exception(&self, context: &str, error: &(dyn Error + 'static)) {
        let cause = error.source().map(|s| s.to_string());
        error!(context, error = %error, cause = cause.as_deref(), "operation failed");
    }
}

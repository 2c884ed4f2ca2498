//! Operator-facing log sink
//!
//! Components never log through ambient state; they receive a [`Reporter`].
//! [`TracingReporter`] forwards to `tracing`, [`ActionsReporter`] writes
//! GitHub Actions workflow commands so annotations show up on the run.

use std::io::Write;

/// Sink for the operator timeline and the final failure
pub trait Reporter: Send + Sync {
    /// Timeline entry
    fn info(&self, message: &str);

    /// Non-fatal problem
    fn warning(&self, message: &str);

    /// Diagnostic detail
    fn debug(&self, message: &str);

    /// Terminal failure; the last thing reported on an unrecovered error
    fn report_failure(&self, message: &str);

    /// Register a secret to be hidden from any later output
    fn mask(&self, _secret: &str) {}
}

/// Reporter backed by the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn report_failure(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Reporter emitting GitHub Actions workflow commands on stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsReporter;

impl ActionsReporter {
    /// Format a workflow command, e.g. `::error::message`
    #[must_use]
    pub fn command(name: &str, message: &str) -> String {
        format!("::{name}::{}", escape_data(message))
    }

    fn emit(line: &str) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        // stdout gone means nobody is listening
        let _ = writeln!(lock, "{line}");
    }
}

impl Reporter for ActionsReporter {
    fn info(&self, message: &str) {
        Self::emit(message);
    }

    fn warning(&self, message: &str) {
        Self::emit(&Self::command("warning", message));
    }

    fn debug(&self, message: &str) {
        Self::emit(&Self::command("debug", message));
    }

    fn report_failure(&self, message: &str) {
        Self::emit(&Self::command("error", message));
    }

    fn mask(&self, secret: &str) {
        if !secret.is_empty() {
            Self::emit(&Self::command("add-mask", secret));
        }
    }
}

fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Whether the process runs as a GitHub Actions step
#[must_use]
pub fn running_in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

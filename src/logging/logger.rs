//! Structured logger facade over the tracing pipeline.

use crate::report::Report;

/// Logger used by command handlers.
///
/// All methods forward to [`tracing`] so output formatting stays in one
/// place (see [`super::subscriber`]).
#[derive(Debug, Default)]
pub struct Logger {
    verbose: bool,
}

impl Logger {
    /// Create a new logger.
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Whether verbose output was requested.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "suiteconf::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a sequence of checker reports: warnings as warnings,
    /// failures and changes as errors or info per `changes_are_info`.
    pub fn reports(&self, reports: &[Report], changes_are_info: bool) {
        for report in reports {
            if report.is_warning {
                self.warn(&report.to_string());
            } else if changes_are_info {
                self.info(&report.to_string());
            } else {
                self.error(&report.to_string());
            }
        }
    }
}

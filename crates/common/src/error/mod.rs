//! Error classification shared by the core and infrastructure layers
//!
//! Module-specific error enums stay local to their module; implementing
//! [`ErrorClassification`] lets callers decide how loudly to report them
//! and whether the current tick counts as failed.

use std::fmt;

/// Standard interface for classifying errors by their characteristics.
pub trait ErrorClassification {
    /// Transient failures that may succeed on a later attempt.
    fn is_retryable(&self) -> bool;

    /// Severity used for logging and alerting decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Errors that must abort the current tick and alert an operator.
    fn is_critical(&self) -> bool {
        self.severity() >= ErrorSeverity::Critical
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Degraded but operational
    Warning,
    /// Failure requiring attention
    Error,
    /// Durable state at risk, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

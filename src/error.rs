//! Structured error types for the DEVS kernel.
//!
//! All fallible public APIs return `Result<T, DevsError>`. The variants
//! follow the failure classes of the kernel: structural bookkeeping
//! errors, malformed model behavior, model-graph errors, resource errors
//! raised by stream writers, and errors raised by user `Dynamics` code.
//! The kernel never swallows any of them.

use thiserror::Error;

/// The top-level error type for the simulation kernel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DevsError {
    // ── Kernel bookkeeping ────────────────────────────────

    /// A simulator, view or event was missing or registered twice.
    #[error("internal error: {0}")]
    Internal(String),

    // ── Model behavior ────────────────────────────────────

    /// A model description or behavior is malformed (negative time
    /// advance, unknown dynamics, conflicting init ports, ...).
    #[error("modelling error: {0}")]
    Modelling(String),

    // ── Model graph ───────────────────────────────────────

    /// The model hierarchy or its connections are inconsistent.
    #[error("graph error: {0}")]
    Graph(String),

    // ── Resources ─────────────────────────────────────────

    /// A stream writer could not open or write its output.
    #[error("i/o error: {0}")]
    Io(String),

    // ── User code ─────────────────────────────────────────

    /// Raised from inside a user transition hook.
    #[error("model `{model}` failed: {message}")]
    Model { model: String, message: String },
}

impl DevsError {
    /// Shorthand used by `Dynamics` implementations to report failures.
    pub fn model(model: impl Into<String>, message: impl Into<String>) -> Self {
        DevsError::Model {
            model: model.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for DevsError {
    fn from(e: std::io::Error) -> Self {
        DevsError::Io(e.to_string())
    }
}

/// Convenience alias for `Result<T, DevsError>`.
pub type DevsResult<T> = Result<T, DevsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_internal() {
        let e = DevsError::Internal("view `v` is unknown".into());
        assert_eq!(e.to_string(), "internal error: view `v` is unknown");
    }

    #[test]
    fn test_error_display_model() {
        let e = DevsError::model("top:a", "boom");
        assert_eq!(e.to_string(), "model `top:a` failed: boom");
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: DevsError = io.into();
        assert!(matches!(e, DevsError::Io(ref m) if m.contains("missing")));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(DevsError::Graph("x".into()));
        assert!(!e.to_string().is_empty());
    }
}

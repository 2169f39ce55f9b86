//! Error types for includefix-edit.
//!
//! This module distinguishes between:
//! - Halts: the run was stopped by policy (strict-mode abort, blocked
//!   discovery) before rewriting could complete
//! - Runtime errors: I/O errors, walk errors, invalid arguments
//!
//! Both make the overall run FAILED (exit code 2); file-local problems are
//! never raised this way — they aggregate into the report instead.

use thiserror::Error;

/// The top-level error type for reconciliation runs.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The run was halted by policy.
    #[error("halted: {0}")]
    Halted(#[from] HaltError),

    /// A runtime/tool error occurred.
    #[error("runtime error: {0}")]
    Runtime(#[from] anyhow::Error),
}

/// Policy-level stop conditions.
#[derive(Debug, Error)]
pub enum HaltError {
    /// Discovery produced no usable headers; nothing can be rewritten safely.
    #[error("no headers discovered under any candidate root")]
    EmptyRegistry,

    /// Strict mode refuses to rewrite when discovery reports ambiguity.
    #[error("{count} header name(s) have conflicting contents (first: {first})")]
    AmbiguousDiscovery { count: u64, first: String },

    /// Strict mode aborts on the first unresolved reference.
    #[error("unresolved reference \"{reference}\" in {file}:{line}")]
    UnresolvedReference {
        file: String,
        line: u64,
        reference: String,
    },
}

impl ReconcileError {
    /// Returns true if this run was stopped by policy rather than a fault.
    pub fn is_halt(&self) -> bool {
        matches!(self, ReconcileError::Halted(_))
    }

    /// Recommended exit code. Any error means the run FAILED.
    pub fn exit_code(&self) -> u8 {
        2
    }
}

/// Result type alias using ReconcileError.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::{HaltError, ReconcileError};

    #[test]
    fn halt_reports_exit_code_2() {
        let err = ReconcileError::from(HaltError::EmptyRegistry);
        assert!(err.is_halt());
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("halted"));
    }

    #[test]
    fn runtime_error_reports_exit_code_2() {
        let err = ReconcileError::from(anyhow::anyhow!("boom"));
        assert!(!err.is_halt());
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("runtime error"));
    }

    #[test]
    fn unresolved_display_names_the_reference() {
        let err = HaltError::UnresolvedReference {
            file: "src/Game.cpp".to_string(),
            line: 7,
            reference: "Core/Input.h".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Core/Input.h"));
        assert!(message.contains("src/Game.cpp:7"));
    }
}

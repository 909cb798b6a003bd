//! Error types for cache queries and the analysis driver.
//!
//! Semantic problems in analysed code are never errors here; they are
//! [`Diagnostic`](crate::hir::Diagnostic) values stored in the cache.

use std::sync::Arc;

use thiserror::Error;

use crate::base::SourceId;

/// Errors returned by cache queries.
///
/// `Clone` so one cached failure can be handed to every waiter.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The value is being computed elsewhere or is not computed yet.
    /// Retrying after more analysis has run may succeed.
    #[error("temporarily unavailable: {reason}")]
    TemporarilyUnavailable { reason: Arc<str> },

    /// Computing the value failed; the failure is cached until the inputs
    /// change.
    #[error("failed to compute {descriptor} for {source_id}: {message}")]
    ComputeFailed {
        descriptor: &'static str,
        source_id: SourceId,
        message: Arc<str>,
    },

    /// A library-scoped descriptor was used without a library, or the
    /// reverse, or a state transition is not allowed.
    #[error("contract violation: {message}")]
    ContractViolation { message: Arc<str> },

    /// The driver stopped while a query was waiting.
    #[error("analysis driver has shut down")]
    Shutdown,

    #[error("unknown source: {0}")]
    UnknownSource(SourceId),
}

impl AnalysisError {
    pub fn contract(message: impl Into<Arc<str>>) -> Self {
        Self::ContractViolation {
            message: message.into(),
        }
    }

    pub fn unavailable(reason: impl Into<Arc<str>>) -> Self {
        Self::TemporarilyUnavailable {
            reason: reason.into(),
        }
    }

    pub fn compute_failed(
        descriptor: &'static str,
        source_id: SourceId,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self::ComputeFailed {
            descriptor,
            source_id,
            message: message.into(),
        }
    }

    /// Whether retrying the same query later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TemporarilyUnavailable { .. })
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = AnalysisError::compute_failed("PARSED_UNIT", SourceId::new(3), "disk on fire");
        assert_eq!(
            err.to_string(),
            "failed to compute PARSED_UNIT for source#3: disk on fire"
        );
        assert_eq!(
            AnalysisError::unavailable("busy").to_string(),
            "temporarily unavailable: busy"
        );
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(AnalysisError::unavailable("x").is_transient());
        assert!(!AnalysisError::Shutdown.is_transient());
        assert!(!AnalysisError::contract("x").is_transient());
    }
}

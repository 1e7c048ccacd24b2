use thiserror::Error;

use crate::error_map::{ErrorCategory, NormalizedError};

pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level failure.
///
/// `NotInitialized` and `OperationInProgress` are contract errors: they are
/// raised before an operation starts and never stored as the session's
/// user-facing `error`. `Operation` carries a failure that happened while an
/// operation was running, already normalized for display.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("signer or protocol client not initialized")]
    NotInitialized,

    #[error("another operation is already in flight")]
    OperationInProgress,

    #[error("{}", .0.message)]
    Operation(NormalizedError),
}

impl EngineError {
    /// Normalize an arbitrary failure message into an operation error.
    pub fn operation(raw: impl AsRef<str>) -> Self {
        Self::Operation(crate::error_map::normalize(raw.as_ref()))
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Operation(normalized) => Some(normalized.category),
            _ => None,
        }
    }

    pub fn normalized(&self) -> Option<&NormalizedError> {
        match self {
            Self::Operation(normalized) => Some(normalized),
            _ => None,
        }
    }
}

//! Typed failures returned by the lifecycle engine.
//!
//! Every bad input comes back as an [`EngineError`]; the engine never
//! panics on caller mistakes. Storage faults are folded into the
//! `StorageUnavailable` kind so callers can distinguish "retry later" from
//! "you asked for something illegal".

use std::fmt;

use crate::request::{EmployeeId, RequestId, RequestStatus, RequestType, Role};
use crate::store::StoreError;

/// The five failure kinds, for callers that dispatch on category rather
/// than on the specific variant (the HTTP layer maps kinds to statuses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthorizationDenied,
    NotFound,
    InvalidState,
    ValidationFailed,
    StorageUnavailable,
}

/// A failed engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The authorization matrix rejects this role/operation/type combination.
    AuthorizationDenied {
        role: Role,
        operation: &'static str,
        request_type: RequestType,
    },
    /// No request with this ID exists.
    RequestNotFound { id: RequestId },
    /// The employee reference does not resolve in the directory.
    EmployeeNotFound { id: EmployeeId },
    /// The operation is illegal from the request's current status. Also the
    /// outcome for the loser of a concurrent-transition race, whose
    /// precondition status changed between read and commit.
    InvalidState {
        operation: &'static str,
        status: RequestStatus,
    },
    /// Input failed a validation rule (e.g. a rejection without a reason).
    ValidationFailed { message: String },
    /// The persistence store could not complete the operation. Retryable by
    /// the caller; the engine itself never retries.
    StorageUnavailable { detail: String },
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthorizationDenied { .. } => ErrorKind::AuthorizationDenied,
            Self::RequestNotFound { .. } | Self::EmployeeNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorizationDenied {
                role,
                operation,
                request_type,
            } => write!(
                f,
                "role {} is not authorized to {} {} requests",
                role,
                operation,
                request_type.display_name()
            ),
            Self::RequestNotFound { id } => write!(f, "request {} not found", id),
            Self::EmployeeNotFound { id } => write!(f, "employee {} not found", id),
            Self::InvalidState { operation, status } => {
                write!(f, "cannot {} a request whose status is {}", operation, status)
            }
            Self::ValidationFailed { message } => write!(f, "validation failed: {}", message),
            Self::StorageUnavailable { detail } => write!(f, "storage unavailable: {}", detail),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::StorageUnavailable {
            detail: err.to_string(),
        }
    }
}

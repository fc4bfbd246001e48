//! Storage abstraction for requests, the review ledger, and rectification
//! notes.
//!
//! This module defines the `RequestStore` trait that abstracts persistence
//! for the lifecycle engine. Implementations provide different backends
//! (in-memory, SQLite). Every backend must honor the same contract: request
//! creation assigns the ID, and `commit_transition` applies a transition
//! atomically only if the request's status is unchanged since the caller
//! read it.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::ledger::{NewRectificationNote, NewReviewEntry, RectificationNote, ReviewEntry};
use crate::request::{
    Actor, EmployeeId, Request, RequestDetails, RequestId, RequestStatus, RequestType, Username,
};

/// A request as handed to the store for creation, before it has an ID.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub request_type: RequestType,
    pub employee: EmployeeId,
    pub submitted_by: Actor,
    pub details: RequestDetails,
    pub submitted_at: DateTime<Utc>,
}

/// The mutation half of a planned transition, applied in one atomic commit
/// together with its audit records.
#[derive(Debug, Clone)]
pub struct TransitionUpdate {
    pub new_status: RequestStatus,
    /// Replacement payload (resubmission only).
    pub new_details: Option<RequestDetails>,
    /// New last-reviewer (review only).
    pub set_reviewer: Option<Actor>,
    /// Whether `submitted_at` is refreshed to `at` (resubmission only).
    pub refresh_submitted_at: bool,
    /// Transition time; becomes `last_modified_at` and the timestamp of any
    /// audit record written by this commit.
    pub at: DateTime<Utc>,
    /// Review ledger entry to append (review only).
    pub ledger: Option<NewReviewEntry>,
    /// Rectification note to append (resubmission only).
    pub note: Option<NewRectificationNote>,
}

/// Outcome of a compare-and-swap commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// The expected status still held; the update and its audit records
    /// were applied atomically.
    Committed(Request),
    /// Another transition changed the status between read and commit.
    Conflict { actual: RequestStatus },
    /// The request no longer exists.
    Missing,
}

/// A storage-layer failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not complete an operation.
    Storage {
        operation: &'static str,
        detail: String,
    },
    /// Persisted data failed to parse back into domain types.
    Corruption { what: String },
}

impl StoreError {
    pub fn storage(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            detail: detail.into(),
        }
    }

    pub fn corruption(what: impl Into<String>) -> Self {
        Self::Corruption { what: what.into() }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { operation, detail } => {
                write!(f, "storage operation '{}' failed: {}", operation, detail)
            }
            Self::Corruption { what } => write!(f, "corrupt stored data: {}", what),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence contract for the lifecycle engine.
///
/// All list accessors return results ordered by request ID ascending;
/// ledger and note accessors return entries oldest first.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Create a request, assigning its ID.
    async fn insert(&self, new: NewRequest) -> Result<Request, StoreError>;

    /// Get a request by ID, returning None if not found.
    async fn get(&self, id: RequestId) -> Result<Option<Request>, StoreError>;

    /// Atomically apply `update` if the request's status still equals
    /// `expected`. The status check, the request mutation, and the appended
    /// audit records are one indivisible commit; a concurrent transition
    /// that got there first yields `CommitResult::Conflict`.
    async fn commit_transition(
        &self,
        id: RequestId,
        expected: RequestStatus,
        update: TransitionUpdate,
    ) -> Result<CommitResult, StoreError>;

    async fn list_all(&self) -> Result<Vec<Request>, StoreError>;

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<Request>, StoreError>;

    async fn list_by_employee(&self, employee: &EmployeeId) -> Result<Vec<Request>, StoreError>;

    async fn list_by_submitter(&self, submitter: &Username) -> Result<Vec<Request>, StoreError>;

    /// Review ledger for a request, oldest first.
    async fn ledger(&self, id: RequestId) -> Result<Vec<ReviewEntry>, StoreError>;

    /// Rectification notes for a request, oldest first.
    async fn rectification_notes(
        &self,
        id: RequestId,
    ) -> Result<Vec<RectificationNote>, StoreError>;
}

//! In-memory store implementation.
//!
//! Holds everything under a single `RwLock` so a compare-and-swap commit
//! (status check, request mutation, audit append) is one critical section.
//! Used by tests and available for single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CommitResult, NewRequest, RequestStore, StoreError, TransitionUpdate};
use crate::ledger::{RectificationNote, ReviewEntry};
use crate::request::{EmployeeId, Request, RequestId, RequestStatus, Username};

struct Inner {
    next_request_id: i64,
    next_entry_id: i64,
    next_note_id: i64,
    requests: HashMap<RequestId, Request>,
    ledger: HashMap<RequestId, Vec<ReviewEntry>>,
    notes: HashMap<RequestId, Vec<RectificationNote>>,
}

/// Thread-safe in-memory request store.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_request_id: 1,
                next_entry_id: 1,
                next_note_id: 1,
                requests: HashMap::new(),
                ledger: HashMap::new(),
                notes: HashMap::new(),
            }),
        }
    }

    fn sorted(mut requests: Vec<Request>) -> Vec<Request> {
        requests.sort_by_key(|request| request.id);
        requests
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn insert(&self, new: NewRequest) -> Result<Request, StoreError> {
        let mut inner = self.inner.write().await;
        let id = RequestId(inner.next_request_id);
        inner.next_request_id += 1;

        let request = Request {
            id,
            request_type: new.request_type,
            employee: new.employee,
            submitted_by: new.submitted_by,
            status: RequestStatus::Pending,
            details: new.details,
            submitted_at: new.submitted_at,
            last_modified_at: new.submitted_at,
            reviewer: None,
        };
        inner.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn get(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.requests.get(&id).cloned())
    }

    async fn commit_transition(
        &self,
        id: RequestId,
        expected: RequestStatus,
        update: TransitionUpdate,
    ) -> Result<CommitResult, StoreError> {
        let mut inner = self.inner.write().await;

        let Some(request) = inner.requests.get_mut(&id) else {
            return Ok(CommitResult::Missing);
        };
        if request.status != expected {
            return Ok(CommitResult::Conflict {
                actual: request.status,
            });
        }

        request.status = update.new_status;
        if let Some(details) = update.new_details {
            request.details = details;
        }
        if let Some(reviewer) = update.set_reviewer {
            request.reviewer = Some(reviewer);
        }
        if update.refresh_submitted_at {
            request.submitted_at = update.at;
        }
        request.last_modified_at = update.at;
        let committed = request.clone();

        if let Some(new_entry) = update.ledger {
            let entry_id = inner.next_entry_id;
            inner.next_entry_id += 1;
            inner.ledger.entry(id).or_default().push(ReviewEntry {
                id: entry_id,
                request: id,
                reviewer: new_entry.reviewer,
                decision: new_entry.decision,
                reason: new_entry.reason,
                reviewed_at: update.at,
            });
        }
        if let Some(new_note) = update.note {
            let note_id = inner.next_note_id;
            inner.next_note_id += 1;
            inner.notes.entry(id).or_default().push(RectificationNote {
                id: note_id,
                request: id,
                noted_by: new_note.noted_by,
                note: new_note.note,
                noted_at: update.at,
            });
        }

        Ok(CommitResult::Committed(committed))
    }

    async fn list_all(&self) -> Result<Vec<Request>, StoreError> {
        let inner = self.inner.read().await;
        Ok(Self::sorted(inner.requests.values().cloned().collect()))
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<Request>, StoreError> {
        let inner = self.inner.read().await;
        Ok(Self::sorted(
            inner
                .requests
                .values()
                .filter(|request| request.status == status)
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_employee(&self, employee: &EmployeeId) -> Result<Vec<Request>, StoreError> {
        let inner = self.inner.read().await;
        Ok(Self::sorted(
            inner
                .requests
                .values()
                .filter(|request| request.employee == *employee)
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_submitter(&self, submitter: &Username) -> Result<Vec<Request>, StoreError> {
        let inner = self.inner.read().await;
        Ok(Self::sorted(
            inner
                .requests
                .values()
                .filter(|request| request.submitted_by.username == *submitter)
                .cloned()
                .collect(),
        ))
    }

    async fn ledger(&self, id: RequestId) -> Result<Vec<ReviewEntry>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.ledger.get(&id).cloned().unwrap_or_default())
    }

    async fn rectification_notes(
        &self,
        id: RequestId,
    ) -> Result<Vec<RectificationNote>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.notes.get(&id).cloned().unwrap_or_default())
    }
}

//! The request lifecycle engine.
//!
//! `LifecycleEngine` is the only way requests change state. Every operation
//! authorizes the acting user first, plans the transition with the pure
//! logic in [`crate::transition`], and then commits it through the store's
//! compare-and-swap so that concurrent actors cannot both move the same
//! request. The engine never retries a lost race; the loser surfaces as an
//! invalid-state error and the caller decides whether to re-read and try
//! again.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::directory::EmployeeDirectory;
use crate::error::EngineError;
use crate::ledger::{NewRectificationNote, RectificationNote, ReviewEntry};
use crate::request::{
    Actor, EmployeeId, Request, RequestDetails, RequestId, RequestStatus, RequestType, Username,
};
use crate::store::{CommitResult, NewRequest, RequestStore, TransitionUpdate};
use crate::transition::{self, Verdict};

pub struct LifecycleEngine {
    store: Arc<dyn RequestStore>,
    directory: Arc<dyn EmployeeDirectory>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn RequestStore>, directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { store, directory }
    }

    /// Submit a new request on behalf of `employee`.
    ///
    /// The actor must be authorized to submit this request type, and the
    /// employee reference must resolve in the directory. The new request
    /// starts out `Pending` with no reviewer.
    pub async fn submit(
        &self,
        actor: &Actor,
        employee: EmployeeId,
        request_type: RequestType,
        details: RequestDetails,
    ) -> Result<Request, EngineError> {
        transition::authorize_submit(actor, request_type)?;

        if !self.directory.contains(&employee).await? {
            return Err(EngineError::EmployeeNotFound { id: employee });
        }

        let request = self
            .store
            .insert(NewRequest {
                request_type,
                employee,
                submitted_by: actor.clone(),
                details,
                submitted_at: Utc::now(),
            })
            .await?;

        info!(
            request = %request.id,
            request_type = %request_type,
            employee = %request.employee,
            submitted_by = %actor,
            "request submitted"
        );
        Ok(request)
    }

    /// Review a pending request: approve it or reject it with a reason.
    ///
    /// Approving a complaint resolves it; approving anything else approves
    /// it. Rejection requires a non-blank reason and parks the request in
    /// `PendingRectification`. The decision lands in the review ledger in
    /// the same commit that changes the status.
    pub async fn review(
        &self,
        actor: &Actor,
        id: RequestId,
        verdict: Verdict,
        reason: Option<String>,
    ) -> Result<Request, EngineError> {
        let request = self.load(id).await?;
        let plan = transition::plan_review(&request, actor, verdict, reason)?;
        let decision = plan.entry.decision;

        let update = TransitionUpdate {
            new_status: plan.next_status,
            new_details: None,
            set_reviewer: Some(actor.clone()),
            refresh_submitted_at: false,
            at: Utc::now(),
            ledger: Some(plan.entry),
            note: None,
        };
        let committed = self.commit(id, request.status, update, "review").await?;

        info!(
            request = %id,
            decision = %decision,
            status = %committed.status,
            reviewer = %actor,
            "request reviewed"
        );
        Ok(committed)
    }

    /// Resubmit a rejected request after rectification.
    ///
    /// Any HRO may resubmit, not only the original submitter. The details
    /// are replaced wholesale, the submission timestamp is refreshed so the
    /// request re-enters review as fresh work, and the mandatory
    /// rectification note is recorded alongside (not inside) the review
    /// ledger.
    pub async fn resubmit(
        &self,
        actor: &Actor,
        id: RequestId,
        updated_details: RequestDetails,
        rectification_note: String,
    ) -> Result<Request, EngineError> {
        let request = self.load(id).await?;
        transition::authorize_resubmit(&request, actor, &rectification_note)?;

        let update = TransitionUpdate {
            new_status: RequestStatus::Pending,
            new_details: Some(updated_details),
            set_reviewer: None,
            refresh_submitted_at: true,
            at: Utc::now(),
            ledger: None,
            note: Some(NewRectificationNote {
                noted_by: actor.clone(),
                note: rectification_note,
            }),
        };
        let committed = self
            .commit(id, RequestStatus::PendingRectification, update, "resubmit")
            .await?;

        info!(request = %id, resubmitted_by = %actor, "request resubmitted");
        Ok(committed)
    }

    pub async fn request(&self, id: RequestId) -> Result<Request, EngineError> {
        self.load(id).await
    }

    pub async fn all_requests(&self) -> Result<Vec<Request>, EngineError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<Request>, EngineError> {
        Ok(self.store.list_by_status(status).await?)
    }

    /// Requests concerning one employee. Unknown employees are an error
    /// rather than an empty list, so that a typo in an employee ID is
    /// distinguishable from an employee with no requests.
    pub async fn requests_for_employee(
        &self,
        employee: &EmployeeId,
    ) -> Result<Vec<Request>, EngineError> {
        if !self.directory.contains(employee).await? {
            return Err(EngineError::EmployeeNotFound {
                id: employee.clone(),
            });
        }
        Ok(self.store.list_by_employee(employee).await?)
    }

    pub async fn requests_submitted_by(
        &self,
        submitter: &Username,
    ) -> Result<Vec<Request>, EngineError> {
        Ok(self.store.list_by_submitter(submitter).await?)
    }

    /// The request's review ledger, oldest decision first.
    pub async fn review_ledger(&self, id: RequestId) -> Result<Vec<ReviewEntry>, EngineError> {
        self.load(id).await?;
        Ok(self.store.ledger(id).await?)
    }

    /// Rectification notes attached at resubmission, oldest first.
    pub async fn rectification_notes(
        &self,
        id: RequestId,
    ) -> Result<Vec<RectificationNote>, EngineError> {
        self.load(id).await?;
        Ok(self.store.rectification_notes(id).await?)
    }

    async fn load(&self, id: RequestId) -> Result<Request, EngineError> {
        self.store
            .get(id)
            .await?
            .ok_or(EngineError::RequestNotFound { id })
    }

    async fn commit(
        &self,
        id: RequestId,
        expected: RequestStatus,
        update: TransitionUpdate,
        operation: &'static str,
    ) -> Result<Request, EngineError> {
        match self.store.commit_transition(id, expected, update).await? {
            CommitResult::Committed(request) => Ok(request),
            CommitResult::Conflict { actual } => Err(EngineError::InvalidState {
                operation,
                status: actual,
            }),
            CommitResult::Missing => Err(EngineError::RequestNotFound { id }),
        }
    }
}

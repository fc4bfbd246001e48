//! Pure transition checks for the three lifecycle operations.
//!
//! Nothing in this module touches storage or the clock. Each function takes
//! the current request (where one exists) and the acting user, and either
//! returns the planned effect or the typed failure. The engine commits the
//! plan against the store; a concurrent transition that invalidates the
//! plan surfaces there as `InvalidState`.

use crate::authorization::{can_review, can_submit};
use crate::error::EngineError;
use crate::ledger::NewReviewEntry;
use crate::request::{Actor, Request, RequestStatus, RequestType, Role};

/// The caller's two-valued review input. The recorded ledger decision is
/// three-valued because approving a complaint records "Resolved".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

/// The planned effect of an accepted review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPlan {
    pub next_status: RequestStatus,
    pub entry: NewReviewEntry,
}

/// Check that `actor` may create a request of `request_type`.
pub fn authorize_submit(actor: &Actor, request_type: RequestType) -> Result<(), EngineError> {
    if !can_submit(actor.role, request_type) {
        return Err(EngineError::AuthorizationDenied {
            role: actor.role,
            operation: "submit",
            request_type,
        });
    }
    Ok(())
}

/// Plan a review of `request` by `reviewer`.
///
/// Approval of a complaint resolves it; approval of anything else approves
/// it. Rejection always parks the request in PendingRectification and
/// requires a non-blank reason, recorded verbatim.
pub fn plan_review(
    request: &Request,
    reviewer: &Actor,
    verdict: Verdict,
    reason: Option<String>,
) -> Result<ReviewPlan, EngineError> {
    if !can_review(reviewer.role, request.request_type) {
        return Err(EngineError::AuthorizationDenied {
            role: reviewer.role,
            operation: "review",
            request_type: request.request_type,
        });
    }
    if !request.status.is_reviewable() {
        return Err(EngineError::InvalidState {
            operation: "review",
            status: request.status,
        });
    }

    match verdict {
        Verdict::Approve => {
            let comment = reason.filter(|r| !r.trim().is_empty());
            if request.request_type == RequestType::Complaint {
                Ok(ReviewPlan {
                    next_status: RequestStatus::Resolved,
                    entry: NewReviewEntry::resolution(reviewer.clone(), comment),
                })
            } else {
                Ok(ReviewPlan {
                    next_status: RequestStatus::Approved,
                    entry: NewReviewEntry::approval(reviewer.clone(), comment),
                })
            }
        }
        Verdict::Reject => match reason {
            Some(reason) if !reason.trim().is_empty() => Ok(ReviewPlan {
                next_status: RequestStatus::PendingRectification,
                entry: NewReviewEntry::rejection(reviewer.clone(), reason),
            }),
            _ => Err(EngineError::validation("rejection reason is mandatory")),
        },
    }
}

/// Check that `actor` may resubmit `request` with the given note.
///
/// Only the HRO role resubmits, even when the original submitter was an
/// Employee raising a complaint. Any HRO will do; rectification is not
/// scoped to the submitter.
pub fn authorize_resubmit(
    request: &Request,
    actor: &Actor,
    rectification_note: &str,
) -> Result<(), EngineError> {
    if actor.role != Role::Hro {
        return Err(EngineError::AuthorizationDenied {
            role: actor.role,
            operation: "resubmit",
            request_type: request.request_type,
        });
    }
    if request.status != RequestStatus::PendingRectification {
        return Err(EngineError::InvalidState {
            operation: "resubmit",
            status: request.status,
        });
    }
    if rectification_note.trim().is_empty() {
        return Err(EngineError::validation("rectification note is mandatory"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Decision;
    use crate::request::{EmployeeId, RequestDetails, RequestId};
    use chrono::Utc;
    use proptest::prelude::*;

    fn request(request_type: RequestType, status: RequestStatus) -> Request {
        let submitted_at = Utc::now();
        Request {
            id: RequestId(1),
            request_type,
            employee: EmployeeId::from("EMP001"),
            submitted_by: Actor::new("hro_user1", Role::Hro),
            status,
            details: RequestDetails::from("{\"grade\":\"7\"}"),
            submitted_at,
            last_modified_at: submitted_at,
            reviewer: None,
        }
    }

    fn hhrmd() -> Actor {
        Actor::new("hhrmd_user", Role::Hhrmd)
    }

    // ============================================================ //
    // Submit authorization
    // ============================================================ //

    #[test]
    fn test_hro_cannot_submit_complaint() {
        let result = authorize_submit(&Actor::new("hro_user1", Role::Hro), RequestType::Complaint);
        assert_eq!(
            result,
            Err(EngineError::AuthorizationDenied {
                role: Role::Hro,
                operation: "submit",
                request_type: RequestType::Complaint,
            })
        );
    }

    #[test]
    fn test_employee_submits_only_complaints() {
        let employee = Actor::new("employee1", Role::Employee);
        assert!(authorize_submit(&employee, RequestType::Complaint).is_ok());
        assert!(authorize_submit(&employee, RequestType::Promotion).is_err());
    }

    #[test]
    fn test_hro_submits_promotion() {
        assert!(authorize_submit(&Actor::new("hro_user1", Role::Hro), RequestType::Promotion).is_ok());
    }

    // ============================================================ //
    // Review planning
    // ============================================================ //

    #[test]
    fn test_approve_pending_promotion() {
        let request = request(RequestType::Promotion, RequestStatus::Pending);
        let plan = plan_review(&request, &hhrmd(), Verdict::Approve, None).unwrap();
        assert_eq!(plan.next_status, RequestStatus::Approved);
        assert_eq!(plan.entry.decision, Decision::Approved);
        assert_eq!(plan.entry.reason, None);
    }

    #[test]
    fn test_approve_complaint_resolves_it() {
        let request = request(RequestType::Complaint, RequestStatus::Pending);
        let reviewer = Actor::new("do_user", Role::Do);
        let plan = plan_review(&request, &reviewer, Verdict::Approve, None).unwrap();
        assert_eq!(plan.next_status, RequestStatus::Resolved);
        assert_eq!(plan.entry.decision, Decision::Resolved);
    }

    #[test]
    fn test_approve_keeps_non_blank_comment_only() {
        let request = request(RequestType::Promotion, RequestStatus::Pending);
        let plan = plan_review(
            &request,
            &hhrmd(),
            Verdict::Approve,
            Some("  ".to_string()),
        )
        .unwrap();
        assert_eq!(plan.entry.reason, None);

        let plan = plan_review(
            &request,
            &hhrmd(),
            Verdict::Approve,
            Some("well documented".to_string()),
        )
        .unwrap();
        assert_eq!(plan.entry.reason.as_deref(), Some("well documented"));
    }

    #[test]
    fn test_reject_without_reason_is_a_validation_failure() {
        let request = request(RequestType::Promotion, RequestStatus::Pending);
        for reason in [None, Some(String::new()), Some("   ".to_string())] {
            let result = plan_review(&request, &hhrmd(), Verdict::Reject, reason);
            assert_eq!(
                result,
                Err(EngineError::validation("rejection reason is mandatory"))
            );
        }
    }

    #[test]
    fn test_reject_records_reason_verbatim() {
        let request = request(RequestType::Promotion, RequestStatus::Pending);
        let plan = plan_review(
            &request,
            &hhrmd(),
            Verdict::Reject,
            Some(" missing service record ".to_string()),
        )
        .unwrap();
        assert_eq!(plan.next_status, RequestStatus::PendingRectification);
        assert_eq!(plan.entry.decision, Decision::Rejected);
        assert_eq!(plan.entry.reason.as_deref(), Some(" missing service record "));
    }

    #[test]
    fn test_review_in_pending_rectification_is_allowed() {
        let request = request(RequestType::Promotion, RequestStatus::PendingRectification);
        let plan = plan_review(&request, &hhrmd(), Verdict::Approve, None).unwrap();
        assert_eq!(plan.next_status, RequestStatus::Approved);
    }

    #[test]
    fn test_review_of_settled_request_is_invalid_state() {
        for status in [
            RequestStatus::Approved,
            RequestStatus::Resolved,
            RequestStatus::Closed,
        ] {
            let request = request(RequestType::Promotion, status);
            let result = plan_review(&request, &hhrmd(), Verdict::Approve, None);
            assert_eq!(
                result,
                Err(EngineError::InvalidState {
                    operation: "review",
                    status,
                })
            );
        }
    }

    #[test]
    fn test_hrmo_cannot_review_complaint() {
        let request = request(RequestType::Complaint, RequestStatus::Pending);
        let reviewer = Actor::new("hrmo_user", Role::Hrmo);
        let result = plan_review(&request, &reviewer, Verdict::Approve, None);
        assert_eq!(
            result,
            Err(EngineError::AuthorizationDenied {
                role: Role::Hrmo,
                operation: "review",
                request_type: RequestType::Complaint,
            })
        );
    }

    #[test]
    fn test_review_authorization_is_checked_before_status() {
        // Authorization outranks the status gate: an unauthorized reviewer
        // gets the same denial whatever the request's status.
        let request = request(RequestType::Complaint, RequestStatus::Resolved);
        let reviewer = Actor::new("hrmo_user", Role::Hrmo);
        let result = plan_review(&request, &reviewer, Verdict::Approve, None);
        assert_eq!(
            result,
            Err(EngineError::AuthorizationDenied {
                role: Role::Hrmo,
                operation: "review",
                request_type: RequestType::Complaint,
            })
        );
    }

    // ============================================================ //
    // Resubmission authorization
    // ============================================================ //

    #[test]
    fn test_resubmit_requires_hro_regardless_of_status() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::PendingRectification,
            RequestStatus::Approved,
        ] {
            let request = request(RequestType::Complaint, status);
            let result = authorize_resubmit(&request, &hhrmd(), "fixed");
            assert_eq!(
                result,
                Err(EngineError::AuthorizationDenied {
                    role: Role::Hhrmd,
                    operation: "resubmit",
                    request_type: RequestType::Complaint,
                })
            );
        }
    }

    #[test]
    fn test_any_hro_may_resubmit() {
        // Rectification is open to every HRO, not just the submitter.
        let request = request(RequestType::Promotion, RequestStatus::PendingRectification);
        assert!(authorize_resubmit(&request, &Actor::new("hro_user2", Role::Hro), "fixed").is_ok());
    }

    #[test]
    fn test_resubmit_outside_pending_rectification_is_invalid_state() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Resolved,
            RequestStatus::Closed,
        ] {
            let request = request(RequestType::Promotion, status);
            let result = authorize_resubmit(&request, &Actor::new("hro_user1", Role::Hro), "fixed");
            assert_eq!(
                result,
                Err(EngineError::InvalidState {
                    operation: "resubmit",
                    status,
                })
            );
        }
    }

    #[test]
    fn test_resubmit_requires_a_note() {
        let request = request(RequestType::Promotion, RequestStatus::PendingRectification);
        let result = authorize_resubmit(&request, &Actor::new("hro_user1", Role::Hro), "   ");
        assert_eq!(
            result,
            Err(EngineError::validation("rectification note is mandatory"))
        );
    }

    // ============================================================ //
    // Properties
    // ============================================================ //

    fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Hro),
            Just(Role::Hhrmd),
            Just(Role::Hrmo),
            Just(Role::Do),
            Just(Role::Employee),
            Just(Role::Po),
            Just(Role::Cscs),
            Just(Role::Hrrp),
        ]
    }

    fn arb_request_type() -> impl Strategy<Value = RequestType> {
        prop_oneof![
            Just(RequestType::Confirmation),
            Just(RequestType::Promotion),
            Just(RequestType::Lwop),
            Just(RequestType::ChangeOfCadre),
            Just(RequestType::Retirement),
            Just(RequestType::Resignation),
            Just(RequestType::ServiceExtension),
            Just(RequestType::Termination),
            Just(RequestType::Dismissal),
            Just(RequestType::Complaint),
        ]
    }

    fn arb_status() -> impl Strategy<Value = RequestStatus> {
        prop_oneof![
            Just(RequestStatus::Pending),
            Just(RequestStatus::Approved),
            Just(RequestStatus::Resolved),
            Just(RequestStatus::PendingRectification),
            Just(RequestStatus::Closed),
        ]
    }

    proptest! {
        /// An accepted review plan always lands in a legal next status and
        /// never records a rejection without its reason.
        #[test]
        fn prop_review_plans_are_well_formed(
            role in arb_role(),
            ty in arb_request_type(),
            status in arb_status(),
            approve in any::<bool>(),
            reason in proptest::option::of("[a-z ]{0,20}"),
        ) {
            let request = request(ty, status);
            let reviewer = Actor::new("someone", role);
            let verdict = if approve { Verdict::Approve } else { Verdict::Reject };
            if let Ok(plan) = plan_review(&request, &reviewer, verdict, reason) {
                prop_assert!(crate::authorization::can_review(role, ty));
                prop_assert!(status.is_reviewable());
                match plan.entry.decision {
                    Decision::Approved => prop_assert_eq!(plan.next_status, RequestStatus::Approved),
                    Decision::Resolved => {
                        prop_assert_eq!(ty, RequestType::Complaint);
                        prop_assert_eq!(plan.next_status, RequestStatus::Resolved);
                    }
                    Decision::Rejected => {
                        prop_assert_eq!(plan.next_status, RequestStatus::PendingRectification);
                        prop_assert!(plan.entry.reason.is_some());
                    }
                }
            }
        }

        /// Resubmission is accepted only for an HRO against a request
        /// awaiting rectification.
        #[test]
        fn prop_resubmit_gate(
            role in arb_role(),
            ty in arb_request_type(),
            status in arb_status(),
        ) {
            let request = request(ty, status);
            let actor = Actor::new("someone", role);
            let accepted = authorize_resubmit(&request, &actor, "corrected").is_ok();
            prop_assert_eq!(
                accepted,
                role == Role::Hro && status == RequestStatus::PendingRectification
            );
        }
    }
}

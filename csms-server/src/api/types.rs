//! Request and response bodies for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use csms_core::{
    Actor, Decision, RectificationNote, Request, RequestStatus, RequestType, ReviewEntry, Role,
    Verdict,
};

/// An acting or recorded user on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorResponse {
    pub username: String,
    pub role: Role,
}

impl From<Actor> for ActorResponse {
    fn from(actor: Actor) -> Self {
        Self {
            username: actor.username.0,
            role: actor.role,
        }
    }
}

/// A request as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub id: i64,
    pub request_type: RequestType,
    /// Human-readable label for the request type.
    pub request_type_label: String,
    pub employee_id: String,
    pub submitted_by: ActorResponse,
    pub status: RequestStatus,
    pub details: String,
    pub submitted_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<ActorResponse>,
}

impl From<Request> for RequestResponse {
    fn from(request: Request) -> Self {
        Self {
            id: request.id.0,
            request_type: request.request_type,
            request_type_label: request.request_type.display_name().to_string(),
            employee_id: request.employee.0,
            submitted_by: request.submitted_by.into(),
            status: request.status,
            details: request.details.0,
            submitted_at: request.submitted_at,
            last_modified_at: request.last_modified_at,
            reviewer: request.reviewer.map(Into::into),
        }
    }
}

/// API response for request list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RequestListResponse {
    pub requests: Vec<RequestResponse>,
}

impl RequestListResponse {
    pub fn from_requests(requests: Vec<Request>) -> Self {
        Self {
            requests: requests.into_iter().map(Into::into).collect(),
        }
    }
}

/// One review decision in a request's history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntryResponse {
    pub id: i64,
    pub reviewer: ActorResponse,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

impl From<ReviewEntry> for ReviewEntryResponse {
    fn from(entry: ReviewEntry) -> Self {
        Self {
            id: entry.id,
            reviewer: entry.reviewer.into(),
            decision: entry.decision,
            reason: entry.reason,
            reviewed_at: entry.reviewed_at,
        }
    }
}

/// One rectification note in a request's history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RectificationNoteResponse {
    pub id: i64,
    pub noted_by: ActorResponse,
    pub note: String,
    pub noted_at: DateTime<Utc>,
}

impl From<RectificationNote> for RectificationNoteResponse {
    fn from(note: RectificationNote) -> Self {
        Self {
            id: note.id,
            noted_by: note.noted_by.into(),
            note: note.note,
            noted_at: note.noted_at,
        }
    }
}

/// API response for the history endpoint: the request together with its
/// full audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub request: RequestResponse,
    pub reviews: Vec<ReviewEntryResponse>,
    pub rectification_notes: Vec<RectificationNoteResponse>,
    /// Status derived by replaying the audit trail, as a consistency
    /// check against the stored status.
    pub replayed_status: RequestStatus,
}

/// Body of POST /api/v1/requests/submit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestBody {
    pub employee_id: String,
    pub request_type: RequestType,
    pub details: String,
}

/// Reviewer's verdict on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewVerdict {
    Approve,
    Reject,
}

impl From<ReviewVerdict> for Verdict {
    fn from(verdict: ReviewVerdict) -> Self {
        match verdict {
            ReviewVerdict::Approve => Verdict::Approve,
            ReviewVerdict::Reject => Verdict::Reject,
        }
    }
}

/// Body of POST /api/v1/requests/:id/review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestBody {
    pub verdict: ReviewVerdict,
    /// Mandatory when rejecting; an optional comment when approving.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of POST /api/v1/requests/:id/resubmit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResubmitRequestBody {
    pub updated_details: String,
    pub rectification_note: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use csms_core::{EmployeeId, RequestDetails, RequestId, Username};

    fn sample_request() -> Request {
        Request {
            id: RequestId(7),
            request_type: RequestType::Promotion,
            employee: EmployeeId::from("EMP001"),
            submitted_by: Actor {
                username: Username::from("hro_user1"),
                role: Role::Hro,
            },
            status: RequestStatus::Pending,
            details: RequestDetails::from("{\"proposedGrade\":\"7B\"}"),
            submitted_at: Utc::now(),
            last_modified_at: Utc::now(),
            reviewer: None,
        }
    }

    #[test]
    fn test_request_response_wire_shape() {
        let value = serde_json::to_value(RequestResponse::from(sample_request())).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["requestType"], "promotion");
        assert_eq!(value["requestTypeLabel"], "Promotion");
        assert_eq!(value["employeeId"], "EMP001");
        assert_eq!(value["submittedBy"]["username"], "hro_user1");
        assert_eq!(value["submittedBy"]["role"], "HRO");
        assert_eq!(value["status"], "pending");
        // Absent reviewer is omitted rather than serialized as null.
        assert!(value.get("reviewer").is_none());
        assert!(value.get("submittedAt").is_some());
    }

    #[test]
    fn test_submit_body_parses_camel_case() {
        let body: SubmitRequestBody = serde_json::from_str(
            r#"{"employeeId":"EMP002","requestType":"change_of_cadre","details":"{}"}"#,
        )
        .unwrap();

        assert_eq!(body.employee_id, "EMP002");
        assert_eq!(body.request_type, RequestType::ChangeOfCadre);
    }

    #[test]
    fn test_review_body_verdict_wire_values() {
        let body: ReviewRequestBody =
            serde_json::from_str(r#"{"verdict":"approve"}"#).unwrap();
        assert_eq!(body.verdict, ReviewVerdict::Approve);
        assert_eq!(body.reason, None);

        let body: ReviewRequestBody =
            serde_json::from_str(r#"{"verdict":"reject","reason":"incomplete"}"#).unwrap();
        assert_eq!(body.verdict, ReviewVerdict::Reject);
        assert_eq!(body.reason.as_deref(), Some("incomplete"));

        assert!(serde_json::from_str::<ReviewRequestBody>(r#"{"verdict":"defer"}"#).is_err());
    }

    #[test]
    fn test_history_response_nests_audit_trail() {
        let entry = ReviewEntry {
            id: 1,
            request: RequestId(7),
            reviewer: Actor {
                username: Username::from("hhrmd_user"),
                role: Role::Hhrmd,
            },
            decision: Decision::Rejected,
            reason: Some("missing documents".to_string()),
            reviewed_at: Utc::now(),
        };
        let history = HistoryResponse {
            request: sample_request().into(),
            reviews: vec![entry.into()],
            rectification_notes: vec![],
            replayed_status: RequestStatus::PendingRectification,
        };

        let value = serde_json::to_value(&history).unwrap();
        assert_eq!(value["reviews"][0]["decision"], "Rejected");
        assert_eq!(value["reviews"][0]["reason"], "missing documents");
        assert_eq!(value["replayedStatus"], "pending_rectification");
        assert_eq!(value["rectificationNotes"], serde_json::json!([]));
    }
}

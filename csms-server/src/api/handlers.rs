//! HTTP handlers for the request lifecycle API.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use csms_core::{
    replay_status, Actor, EmployeeId, EngineError, ErrorKind, RequestDetails, RequestId,
    RequestStatus, Username,
};

use super::types::{
    HistoryResponse, RequestListResponse, RequestResponse, ResubmitRequestBody, ReviewRequestBody,
    SubmitRequestBody,
};
use crate::AppState;

/// Header naming the acting user. The deployment's authenticating proxy is
/// expected to have verified the identity before it reaches the service.
pub const ACTING_USER_HEADER: &str = "x-acting-user";

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/requests", get(list_requests))
        .route("/api/v1/requests/submit", post(submit_request))
        .route("/api/v1/requests/:id", get(get_request))
        .route("/api/v1/requests/:id/review", post(review_request))
        .route("/api/v1/requests/:id/resubmit", post(resubmit_request))
        .route("/api/v1/requests/:id/history", get(get_request_history))
        .route(
            "/api/v1/requests/employee/:employee_id",
            get(list_requests_for_employee),
        )
        .route(
            "/api/v1/requests/user/:username",
            get(list_requests_for_user),
        )
}

/// Build an error response. Every error body on this API is the JSON
/// envelope `{"error": <message>}`.
fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Resolve the acting user from the `X-Acting-User` header.
///
/// Returns the roster's actor for that username, or an error response when
/// the header is missing (401) or names nobody on the roster (403).
#[allow(clippy::result_large_err)] // Response is large but this is idiomatic in Axum handlers
fn resolve_actor(headers: &HeaderMap, state: &AppState) -> Result<Actor, Response> {
    let username = match headers
        .get(ACTING_USER_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Missing X-Acting-User header",
            ))
        }
    };

    state
        .roster
        .resolve(username)
        .ok_or_else(|| error_response(StatusCode::FORBIDDEN, format!("Unknown user '{}'", username)))
}

/// Map an engine error onto the HTTP status that describes it.
fn engine_error_response(err: EngineError) -> Response {
    let status = match err.kind() {
        ErrorKind::AuthorizationDenied => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    if status == StatusCode::SERVICE_UNAVAILABLE {
        error!("Storage failure behind API request: {}", err);
    }
    error_response(status, err.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

/// Handler: POST /api/v1/requests/submit
///
/// Submits a new request on behalf of an employee. The acting user must be
/// authorized to submit this request type.
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<RequestResponse>), Response> {
    let actor = resolve_actor(&headers, &state)?;

    if body.details.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Request details must not be empty",
        ));
    }

    let request = state
        .engine
        .submit(
            &actor,
            EmployeeId::from(body.employee_id),
            body.request_type,
            RequestDetails::from(body.details),
        )
        .await
        .map_err(engine_error_response)?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

/// Handler: GET /api/v1/requests
///
/// Lists all requests, optionally filtered with `?status=`.
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<RequestListResponse>, Response> {
    resolve_actor(&headers, &state)?;

    let requests = match query.status.as_deref() {
        Some(raw) => {
            let status = RequestStatus::parse(raw).ok_or_else(|| {
                error_response(StatusCode::BAD_REQUEST, format!("Unknown status '{}'", raw))
            })?;
            state.engine.requests_by_status(status).await
        }
        None => state.engine.all_requests().await,
    }
    .map_err(engine_error_response)?;

    Ok(Json(RequestListResponse::from_requests(requests)))
}

/// Handler: GET /api/v1/requests/:id
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<RequestResponse>, Response> {
    resolve_actor(&headers, &state)?;

    let request = state
        .engine
        .request(RequestId(id))
        .await
        .map_err(engine_error_response)?;
    Ok(Json(request.into()))
}

/// Handler: POST /api/v1/requests/:id/review
///
/// Records the acting reviewer's verdict. Rejections must carry a reason.
pub async fn review_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<ReviewRequestBody>,
) -> Result<Json<RequestResponse>, Response> {
    let actor = resolve_actor(&headers, &state)?;

    let request = state
        .engine
        .review(&actor, RequestId(id), body.verdict.into(), body.reason)
        .await
        .map_err(engine_error_response)?;
    Ok(Json(request.into()))
}

/// Handler: POST /api/v1/requests/:id/resubmit
///
/// Returns a rejected request to the review queue with corrected details
/// and a mandatory rectification note.
pub async fn resubmit_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<ResubmitRequestBody>,
) -> Result<Json<RequestResponse>, Response> {
    let actor = resolve_actor(&headers, &state)?;

    if body.updated_details.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Updated details must not be empty",
        ));
    }

    let request = state
        .engine
        .resubmit(
            &actor,
            RequestId(id),
            RequestDetails::from(body.updated_details),
            body.rectification_note,
        )
        .await
        .map_err(engine_error_response)?;
    Ok(Json(request.into()))
}

/// Handler: GET /api/v1/requests/:id/history
///
/// Returns the request together with its review ledger and rectification
/// notes, plus the status derived by replaying them.
pub async fn get_request_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<HistoryResponse>, Response> {
    resolve_actor(&headers, &state)?;

    let id = RequestId(id);
    let request = state
        .engine
        .request(id)
        .await
        .map_err(engine_error_response)?;
    let reviews = state
        .engine
        .review_ledger(id)
        .await
        .map_err(engine_error_response)?;
    let notes = state
        .engine
        .rectification_notes(id)
        .await
        .map_err(engine_error_response)?;

    let replayed_status = replay_status(&reviews, notes.len());

    Ok(Json(HistoryResponse {
        request: request.into(),
        reviews: reviews.into_iter().map(Into::into).collect(),
        rectification_notes: notes.into_iter().map(Into::into).collect(),
        replayed_status,
    }))
}

/// Handler: GET /api/v1/requests/employee/:employee_id
///
/// Lists every request concerning one employee.
pub async fn list_requests_for_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(employee_id): Path<String>,
) -> Result<Json<RequestListResponse>, Response> {
    resolve_actor(&headers, &state)?;

    let employee = EmployeeId::from(employee_id);
    let requests = state
        .engine
        .requests_for_employee(&employee)
        .await
        .map_err(engine_error_response)?;
    Ok(Json(RequestListResponse::from_requests(requests)))
}

/// Handler: GET /api/v1/requests/user/:username
///
/// Lists every request submitted by one user account.
pub async fn list_requests_for_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<RequestListResponse>, Response> {
    resolve_actor(&headers, &state)?;

    if state.roster.resolve(&username).is_none() {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Unknown user '{}'", username),
        ));
    }

    let submitter = Username::from(username);
    let requests = state
        .engine
        .requests_submitted_by(&submitter)
        .await
        .map_err(engine_error_response)?;
    Ok(Json(RequestListResponse::from_requests(requests)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Roster;
    use axum::http::HeaderValue;
    use csms_core::{InMemoryStore, LifecycleEngine, RequestType, Role};

    fn test_state() -> Arc<AppState> {
        let roster = Roster::seed();
        let store = Arc::new(InMemoryStore::new());
        let directory = Arc::new(roster.directory());
        Arc::new(AppState {
            engine: LifecycleEngine::new(store, directory),
            roster,
        })
    }

    #[test]
    fn test_resolve_actor_success() {
        let state = test_state();
        let mut headers = HeaderMap::new();
        headers.insert(ACTING_USER_HEADER, HeaderValue::from_static("hhrmd_user"));

        let actor = resolve_actor(&headers, &state).unwrap();
        assert_eq!(actor.role, Role::Hhrmd);
        assert_eq!(actor.username.0, "hhrmd_user");
    }

    #[test]
    fn test_resolve_actor_missing_header() {
        let state = test_state();
        let headers = HeaderMap::new();

        let response = resolve_actor(&headers, &state).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_resolve_actor_blank_header() {
        let state = test_state();
        let mut headers = HeaderMap::new();
        headers.insert(ACTING_USER_HEADER, HeaderValue::from_static("  "));

        let response = resolve_actor(&headers, &state).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_resolve_actor_unknown_user() {
        let state = test_state();
        let mut headers = HeaderMap::new();
        headers.insert(ACTING_USER_HEADER, HeaderValue::from_static("intruder"));

        let response = resolve_actor(&headers, &state).unwrap_err();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_engine_errors_map_to_http_statuses() {
        let cases = vec![
            (
                EngineError::AuthorizationDenied {
                    role: Role::Po,
                    operation: "submit",
                    request_type: RequestType::Promotion,
                },
                StatusCode::FORBIDDEN,
            ),
            (
                EngineError::RequestNotFound { id: RequestId(1) },
                StatusCode::NOT_FOUND,
            ),
            (
                EngineError::EmployeeNotFound {
                    id: EmployeeId::from("EMP404"),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                EngineError::InvalidState {
                    operation: "review",
                    status: RequestStatus::Approved,
                },
                StatusCode::CONFLICT,
            ),
            (
                EngineError::validation("rejection reason is mandatory"),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::StorageUnavailable {
                    detail: "disk full".to_string(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(engine_error_response(err).status(), expected);
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("error response carries a content type")
            .clone();
        assert_eq!(content_type, "application/json");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_bodies_are_json_envelopes() {
        let response = engine_error_response(EngineError::InvalidState {
            operation: "review",
            status: RequestStatus::Approved,
        });
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "cannot review a request whose status is approved" })
        );

        // The header-resolution failures use the same envelope.
        let state = test_state();
        let response = resolve_actor(&HeaderMap::new(), &state).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Missing X-Acting-User header" })
        );
    }
}

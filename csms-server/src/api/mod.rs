//! HTTP API for the request lifecycle.
//!
//! Every endpoint under `/api/v1` identifies the acting user from the
//! `X-Acting-User` header, resolves it against the roster, and maps the
//! engine's answer onto HTTP status codes. Identity verification itself is
//! the deployment's concern; the service trusts the header.

pub mod handlers;
pub mod types;

pub use handlers::api_router;

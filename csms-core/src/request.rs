//! Domain types for HR action requests.
//!
//! This module defines the identifiers, enumerations, and the request record
//! itself. Following the principle of "make illegal states unrepresentable",
//! the status enum contains only statuses a request can actually hold: there
//! is no dead-end `Rejected` terminal, because a rejection always moves the
//! request to `PendingRectification`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for a request's store-assigned identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub i64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Newtype for an employee reference to prevent mixing with other strings.
///
/// The engine never owns employee data; it only carries this reference and
/// checks it against the injected directory at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EmployeeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EmployeeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype for an acting user's username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(pub String);

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Authorization category of an acting user.
///
/// Only HRO, HHRMD, HRMO, DO, and Employee hold any rights in the
/// authorization matrix; the remaining roles exist so that "no other role
/// may submit or review" is checked against real variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Human Resource Officer: submits on behalf of employees.
    Hro,
    /// Head of HR Management Division: reviews every request type.
    Hhrmd,
    /// HR Management Officer: reviews ordinary HR actions.
    Hrmo,
    /// Disciplinary Officer: reviews complaints and disciplinary actions.
    Do,
    /// An employee acting for themselves.
    Employee,
    /// Planning Officer (read-only elsewhere in the system).
    Po,
    /// Civil Service Commission Secretary (read-only elsewhere).
    Cscs,
    /// HR Responsible Personnel (read-only elsewhere).
    Hrrp,
}

impl Role {
    /// Every role, for exhaustive iteration in tests and table checks.
    pub const ALL: [Role; 8] = [
        Role::Hro,
        Role::Hhrmd,
        Role::Hrmo,
        Role::Do,
        Role::Employee,
        Role::Po,
        Role::Cscs,
        Role::Hrrp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hro => "HRO",
            Self::Hhrmd => "HHRMD",
            Self::Hrmo => "HRMO",
            Self::Do => "DO",
            Self::Employee => "EMPLOYEE",
            Self::Po => "PO",
            Self::Cscs => "CSCS",
            Self::Hrrp => "HRRP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HRO" => Some(Self::Hro),
            "HHRMD" => Some(Self::Hhrmd),
            "HRMO" => Some(Self::Hrmo),
            "DO" => Some(Self::Do),
            "EMPLOYEE" => Some(Self::Employee),
            "PO" => Some(Self::Po),
            "CSCS" => Some(Self::Cscs),
            "HRRP" => Some(Self::Hrrp),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fixed enumeration of HR actions a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Confirmation,
    Promotion,
    Lwop,
    ChangeOfCadre,
    Retirement,
    Resignation,
    ServiceExtension,
    Termination,
    Dismissal,
    Complaint,
}

impl RequestType {
    /// Every request type, for exhaustive iteration in tests and the matrix.
    pub const ALL: [RequestType; 10] = [
        RequestType::Confirmation,
        RequestType::Promotion,
        RequestType::Lwop,
        RequestType::ChangeOfCadre,
        RequestType::Retirement,
        RequestType::Resignation,
        RequestType::ServiceExtension,
        RequestType::Termination,
        RequestType::Dismissal,
        RequestType::Complaint,
    ];

    /// Stable machine-readable form, used in storage columns and parsing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::Promotion => "promotion",
            Self::Lwop => "lwop",
            Self::ChangeOfCadre => "change_of_cadre",
            Self::Retirement => "retirement",
            Self::Resignation => "resignation",
            Self::ServiceExtension => "service_extension",
            Self::Termination => "termination",
            Self::Dismissal => "dismissal",
            Self::Complaint => "complaint",
        }
    }

    /// Parse the machine-readable form back into a type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmation" => Some(Self::Confirmation),
            "promotion" => Some(Self::Promotion),
            "lwop" => Some(Self::Lwop),
            "change_of_cadre" => Some(Self::ChangeOfCadre),
            "retirement" => Some(Self::Retirement),
            "resignation" => Some(Self::Resignation),
            "service_extension" => Some(Self::ServiceExtension),
            "termination" => Some(Self::Termination),
            "dismissal" => Some(Self::Dismissal),
            "complaint" => Some(Self::Complaint),
            _ => None,
        }
    }

    /// Human-readable label for logs and API payloads.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Confirmation => "Employee Confirmation",
            Self::Promotion => "Promotion",
            Self::Lwop => "Leave Without Pay (LWOP)",
            Self::ChangeOfCadre => "Change of Cadre",
            Self::Retirement => "Retirement",
            Self::Resignation => "Resignation (Employee)",
            Self::ServiceExtension => "Service Extension",
            Self::Termination => "Termination",
            Self::Dismissal => "Dismissal",
            Self::Complaint => "Complaints",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Status of a request in its review lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Submitted and awaiting review.
    Pending,
    /// Approved by a reviewer (terminal).
    Approved,
    /// Approved complaint (terminal; complaints resolve rather than approve).
    Resolved,
    /// Rejected and awaiting rectification by an HRO.
    PendingRectification,
    /// Archived by external administrative action (terminal). No engine
    /// operation produces this status.
    Closed,
}

impl RequestStatus {
    /// Stable machine-readable form, used in storage columns and parsing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Resolved => "resolved",
            Self::PendingRectification => "pending_rectification",
            Self::Closed => "closed",
        }
    }

    /// Parse the machine-readable form back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "resolved" => Some(Self::Resolved),
            "pending_rectification" => Some(Self::PendingRectification),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Whether a reviewer may act on a request in this status.
    pub fn is_reviewable(&self) -> bool {
        matches!(self, Self::Pending | Self::PendingRectification)
    }

    /// Whether this status admits no further engine transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An acting user: who they are and the role they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: Username,
    pub role: Role,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: Username(username.into()),
            role,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}

/// Opaque request payload. The engine copies it at submission and replaces
/// it wholesale at resubmission; it never inspects the contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetails(pub String);

impl From<String> for RequestDetails {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestDetails {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A tracked HR action request.
///
/// `employee` and `submitted_by` never change after creation. `details` and
/// `status` are the only fields a transition may rewrite, plus the
/// bookkeeping fields: `submitted_at` is refreshed by resubmission,
/// `last_modified_at` by every accepted transition, and `reviewer` records
/// whoever last reviewed the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub request_type: RequestType,
    pub employee: EmployeeId,
    pub submitted_by: Actor,
    pub status: RequestStatus,
    pub details: RequestDetails,
    pub submitted_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub reviewer: Option<Actor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_type_parse_round_trip() {
        for ty in RequestType::ALL {
            assert_eq!(RequestType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(RequestType::parse("unknown"), None);
    }

    #[test]
    fn test_request_status_parse_round_trip() {
        let all = [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Resolved,
            RequestStatus::PendingRectification,
            RequestStatus::Closed,
        ];
        for status in all {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("rejected"), None);
    }

    #[test]
    fn test_reviewable_statuses() {
        assert!(RequestStatus::Pending.is_reviewable());
        assert!(RequestStatus::PendingRectification.is_reviewable());
        assert!(!RequestStatus::Approved.is_reviewable());
        assert!(!RequestStatus::Resolved.is_reviewable());
        assert!(!RequestStatus::Closed.is_reviewable());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Resolved.is_terminal());
        assert!(RequestStatus::Closed.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::PendingRectification.is_terminal());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(RequestType::Confirmation.display_name(), "Employee Confirmation");
        assert_eq!(RequestType::Lwop.display_name(), "Leave Without Pay (LWOP)");
        assert_eq!(RequestType::Complaint.display_name(), "Complaints");
        assert_eq!(RequestType::Resignation.display_name(), "Resignation (Employee)");
    }

    #[test]
    fn test_role_serde_uses_uppercase_names() {
        let json = serde_json::to_string(&Role::Hhrmd).unwrap();
        assert_eq!(json, "\"HHRMD\"");
        let parsed: Role = serde_json::from_str("\"HRO\"").unwrap();
        assert_eq!(parsed, Role::Hro);
    }

    #[test]
    fn test_newtype_display() {
        assert_eq!(RequestId(42).to_string(), "42");
        assert_eq!(EmployeeId::from("EMP001").to_string(), "EMP001");
        assert_eq!(
            Actor::new("hro_user1", Role::Hro).to_string(),
            "hro_user1 (HRO)"
        );
    }
}

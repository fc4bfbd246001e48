//! The role × request-type authorization matrix.
//!
//! Pure lookup tables with no side effects. The policy lives here as literal
//! data so that granting a role a new right is a one-line edit to a table
//! row, with no transition logic involved.

use crate::request::{RequestType, Role};

/// Request types an HRO may submit: every type except complaints, which
/// only the affected employee may raise.
const HRO_SUBMITS: &[RequestType] = &[
    RequestType::Confirmation,
    RequestType::Promotion,
    RequestType::Lwop,
    RequestType::ChangeOfCadre,
    RequestType::Retirement,
    RequestType::Resignation,
    RequestType::ServiceExtension,
    RequestType::Termination,
    RequestType::Dismissal,
];

/// Request types an employee may submit for themselves.
const EMPLOYEE_SUBMITS: &[RequestType] = &[RequestType::Complaint];

/// Request types an HRMO may review: ordinary HR actions, excluding
/// complaints and disciplinary matters.
const HRMO_REVIEWS: &[RequestType] = &[
    RequestType::Confirmation,
    RequestType::Promotion,
    RequestType::Lwop,
    RequestType::ChangeOfCadre,
    RequestType::Retirement,
    RequestType::Resignation,
    RequestType::ServiceExtension,
];

/// Request types a Disciplinary Officer may review.
const DO_REVIEWS: &[RequestType] = &[
    RequestType::Complaint,
    RequestType::Termination,
    RequestType::Dismissal,
];

/// Submission rights. Roles absent from the table may submit nothing.
const SUBMIT_MATRIX: &[(Role, &[RequestType])] = &[
    (Role::Hro, HRO_SUBMITS),
    (Role::Employee, EMPLOYEE_SUBMITS),
];

/// Review rights. Roles absent from the table may review nothing.
const REVIEW_MATRIX: &[(Role, &[RequestType])] = &[
    (Role::Hhrmd, &RequestType::ALL),
    (Role::Hrmo, HRMO_REVIEWS),
    (Role::Do, DO_REVIEWS),
];

fn permits(matrix: &[(Role, &[RequestType])], role: Role, request_type: RequestType) -> bool {
    matrix
        .iter()
        .any(|(r, types)| *r == role && types.contains(&request_type))
}

/// Whether `role` may submit a request of `request_type`.
pub fn can_submit(role: Role, request_type: RequestType) -> bool {
    permits(SUBMIT_MATRIX, role, request_type)
}

/// Whether `role` may review (approve or reject) a request of `request_type`.
pub fn can_review(role: Role, request_type: RequestType) -> bool {
    permits(REVIEW_MATRIX, role, request_type)
}

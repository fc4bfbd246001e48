//! The append-only review ledger and rectification annotations.
//!
//! Every accepted review writes exactly one [`ReviewEntry`]; entries are
//! never edited or deleted. Resubmissions do not touch the ledger: the
//! HRO's note is kept in a separate annotation stream so the ledger remains
//! exactly the sequence of review decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::request::{Actor, RequestId, RequestStatus};

/// Outcome recorded by a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
    /// Approval of a complaint; complaints resolve rather than approve.
    Resolved,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Resolved => "Resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            "Resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable record of a review decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    /// Store-assigned, monotonically increasing within a request.
    pub id: i64,
    pub request: RequestId,
    pub reviewer: Actor,
    pub decision: Decision,
    /// Mandatory for rejections; an optional comment otherwise.
    pub reason: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// A review entry before the store has assigned its ID and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReviewEntry {
    pub reviewer: Actor,
    pub decision: Decision,
    pub reason: Option<String>,
}

impl NewReviewEntry {
    pub fn approval(reviewer: Actor, comment: Option<String>) -> Self {
        Self {
            reviewer,
            decision: Decision::Approved,
            reason: comment,
        }
    }

    pub fn resolution(reviewer: Actor, comment: Option<String>) -> Self {
        Self {
            reviewer,
            decision: Decision::Resolved,
            reason: comment,
        }
    }

    pub fn rejection(reviewer: Actor, reason: String) -> Self {
        Self {
            reviewer,
            decision: Decision::Rejected,
            reason: Some(reason),
        }
    }
}

/// One immutable annotation from a rectification/resubmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectificationNote {
    /// Store-assigned, monotonically increasing within a request.
    pub id: i64,
    pub request: RequestId,
    pub noted_by: Actor,
    pub note: String,
    pub noted_at: DateTime<Utc>,
}

/// A rectification note before the store has assigned its ID and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRectificationNote {
    pub noted_by: Actor,
    pub note: String,
}

/// Derive the status a request must hold from its audit trail.
///
/// A request starts Pending at creation. Each rejection parks it in
/// PendingRectification until the matching resubmission (one rectification
/// note per rejection) returns it to Pending; an approval or resolution is
/// terminal. Administrative closure happens outside the engine and is
/// therefore not derivable here.
pub fn replay_status(entries: &[ReviewEntry], rectification_count: usize) -> RequestStatus {
    match entries.last().map(|entry| entry.decision) {
        None => RequestStatus::Pending,
        Some(Decision::Approved) => RequestStatus::Approved,
        Some(Decision::Resolved) => RequestStatus::Resolved,
        Some(Decision::Rejected) => {
            let rejections = entries
                .iter()
                .filter(|entry| entry.decision == Decision::Rejected)
                .count();
            if rectification_count >= rejections {
                RequestStatus::Pending
            } else {
                RequestStatus::PendingRectification
            }
        }
    }
}

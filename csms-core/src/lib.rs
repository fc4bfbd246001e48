pub mod authorization;
pub mod directory;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod request;
pub mod store;
pub mod transition;

pub use authorization::{can_review, can_submit};
pub use directory::{EmployeeDirectory, StaticDirectory};
pub use engine::LifecycleEngine;
pub use error::{EngineError, ErrorKind};
pub use ledger::{
    replay_status, Decision, NewRectificationNote, NewReviewEntry, RectificationNote, ReviewEntry,
};
pub use request::{
    Actor, EmployeeId, Request, RequestDetails, RequestId, RequestStatus, RequestType, Role,
    Username,
};
pub use store::{
    CommitResult, InMemoryStore, NewRequest, RequestStore, SqliteStore, StoreError,
    TransitionUpdate,
};
pub use transition::{authorize_resubmit, authorize_submit, plan_review, ReviewPlan, Verdict};

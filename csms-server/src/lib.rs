pub mod api;
pub mod config;
pub mod roster;

use csms_core::LifecycleEngine;

pub use api::api_router;
pub use roster::Roster;

pub struct AppState {
    pub engine: LifecycleEngine,
    pub roster: Roster,
}

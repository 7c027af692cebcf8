//! Application wiring and shared runtime state.

mod orchestrator;
mod state;

pub use orchestrator::App;
pub use state::VisionState;

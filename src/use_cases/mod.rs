// Use cases layer: application workflows for the match server.

pub mod game;
pub mod registry;
pub mod types;

pub use registry::{MatchError, MatchHandle, MatchRegistry, MatchSettings};
pub use types::{MatchEvent, MatchUpdate, ServerState};

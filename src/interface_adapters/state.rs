use crate::use_cases::MatchRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Owns the set of active match tasks and their channel wiring.
    pub match_registry: Arc<MatchRegistry>,
    // Match that sockets land in when they name none.
    pub default_match_id: Arc<str>,
}

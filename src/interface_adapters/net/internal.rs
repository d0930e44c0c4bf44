use crate::domain::Team;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_match_serializer;
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

#[derive(Debug, serde::Deserialize)]
pub struct MatchInitRequest {
    // Match id provided by the head service.
    match_id: String,
    // Player ids that are allowed to play in the match.
    #[serde(default)]
    allowed_player_ids: Vec<u64>,
    // Service-side team rosters; listed players always spawn on that team.
    #[serde(default)]
    red_team_ids: Vec<u64>,
    #[serde(default)]
    blue_team_ids: Vec<u64>,
}

#[derive(Debug, serde::Serialize)]
struct MatchInitResponse {
    // The match id that was created.
    match_id: String,
}

pub async fn create_match_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MatchInitRequest>,
) -> impl IntoResponse {
    let match_id = payload.match_id.trim().to_string();
    if match_id.is_empty() {
        // Service-only route, but it still speaks the JSON error schema.
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("match_id is required")),
        )
            .into_response();
    }

    // Rostered players are implicitly allowed to play.
    let mut allowed_players: HashSet<u64> = payload.allowed_player_ids.into_iter().collect();
    let mut team_assignments: HashMap<u64, Team> = HashMap::new();
    for player_id in payload.red_team_ids {
        allowed_players.insert(player_id);
        team_assignments.insert(player_id, Team::Red);
    }
    for player_id in payload.blue_team_ids {
        allowed_players.insert(player_id);
        team_assignments.insert(player_id, Team::Blue);
    }

    // Created matches are not pinned and will be removed on last disconnect.
    match state
        .match_registry
        .create_match(match_id.clone(), allowed_players, team_assignments, false)
        .await
    {
        Ok(handle) => {
            // Serializer first so the earliest subscriber already gets bytes.
            spawn_match_serializer(&handle);
            state.match_registry.clone().spawn_match_end_watcher(
                handle.match_id.clone(),
                handle.server_state_tx.subscribe(),
            );
            (StatusCode::CREATED, Json(MatchInitResponse { match_id })).into_response()
        }
        Err(crate::use_cases::MatchError::AlreadyExists) => {
            (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new("match already exists")),
            )
                .into_response()
        }
    }
}

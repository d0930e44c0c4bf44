// Use-case level inputs/outputs for the match loop.

use crate::domain::{Team, ZoneEvent, ZoneId};

/// Inbound events flowing from client connections into the match task.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    Join {
        player_id: u64,
        team: Team,
        display_name: String,
    },
    Leave {
        player_id: u64,
    },
    ZoneEntered {
        player_id: u64,
        zone: ZoneId,
    },
    ZoneExited {
        player_id: u64,
        zone: ZoneId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerState {
    Lobby,
    MatchStarting { in_seconds: u32 },
    MatchRunning,
    MatchEnded,
}

/// One authoritative state change, broadcast to every observer in the order
/// the match task applied it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchUpdate {
    pub tick: u64,
    pub event: ZoneEvent,
}

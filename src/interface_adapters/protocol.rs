// Wire protocol DTOs and conversions for public match server messages.
// Internal service-to-service DTOs should live outside this module.

use crate::domain::state::{ContestSnapshot, MatchSnapshot, ZoneSnapshot};
use crate::domain::{Team, ZoneEvent, ZoneId};
use crate::use_cases::{MatchUpdate, ServerState};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: String, team: TeamDto },
    // One authoritative state change, in application order.
    MatchUpdate(MatchUpdateDto),
    // High-level server state transitions (lobby, match start/end).
    GameState(ServerStateDto),
    // Full zone state, sent on join and for lag recovery.
    Snapshot(MatchSnapshotDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message with identity metadata.
    Join(JoinPayload),
    // Zone presence transitions sent after a successful Join.
    Zone(ZonePresenceDto),
}

/// Payload for the Join handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub display_name: String,
    pub team: TeamDto,
    // Pre-assigned id handed out by the match-creating service; omitted for
    // open matches, where the server assigns one.
    #[serde(default)]
    pub player_id: Option<u64>,
}

/// A player crossing a zone boundary, as reported by their client.
#[derive(Debug, Clone, Deserialize)]
pub struct ZonePresenceDto {
    pub zone: ZoneIdDto,
    pub kind: PresenceKindDto,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceKindDto {
    Entered,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamDto {
    Red,
    Blue,
}

impl From<Team> for TeamDto {
    fn from(team: Team) -> Self {
        match team {
            Team::Red => TeamDto::Red,
            Team::Blue => TeamDto::Blue,
        }
    }
}

impl From<TeamDto> for Team {
    fn from(team: TeamDto) -> Self {
        match team {
            TeamDto::Red => Team::Red,
            TeamDto::Blue => Team::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneIdDto {
    A,
    B,
    C,
}

impl From<ZoneId> for ZoneIdDto {
    fn from(zone: ZoneId) -> Self {
        match zone {
            ZoneId::A => ZoneIdDto::A,
            ZoneId::B => ZoneIdDto::B,
            ZoneId::C => ZoneIdDto::C,
        }
    }
}

impl From<ZoneIdDto> for ZoneId {
    fn from(zone: ZoneIdDto) -> Self {
        match zone {
            ZoneIdDto::A => ZoneId::A,
            ZoneIdDto::B => ZoneId::B,
            ZoneIdDto::C => ZoneId::C,
        }
    }
}

/// One broadcast state change for wire transmission.
#[derive(Debug, Clone, Serialize)]
pub struct MatchUpdateDto {
    pub tick: u64,
    pub event: ZoneEventDto,
}

impl From<MatchUpdate> for MatchUpdateDto {
    fn from(update: MatchUpdate) -> Self {
        Self {
            tick: update.tick,
            event: ZoneEventDto::from(&update.event),
        }
    }
}

/// Flattened zone events for wire transmission. Player ids ride as strings
/// so browser clients never round u64s through doubles.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneEventDto {
    ZoneActivated {
        zone: ZoneIdDto,
    },
    CountdownTick {
        seconds_remaining: f32,
    },
    ContestStarted {
        zone: ZoneIdDto,
        player_id: String,
        team: TeamDto,
    },
    ContestTick {
        zone: ZoneIdDto,
        team: TeamDto,
        seconds_left: f32,
        fill: f32,
    },
    ContestStopped {
        zone: ZoneIdDto,
    },
    ContestResolved {
        zone: ZoneIdDto,
        player_id: String,
        team: TeamDto,
    },
    // Slot (0/1/2) rides along so score widgets can index their text fields
    // without mapping zone names.
    ScoreChanged {
        team: TeamDto,
        zone: ZoneIdDto,
        slot: u8,
        score: u32,
    },
    ZoneFullyCaptured {
        zone: ZoneIdDto,
        team: TeamDto,
    },
    MatchWon {
        team: TeamDto,
    },
}

impl From<&ZoneEvent> for ZoneEventDto {
    fn from(event: &ZoneEvent) -> Self {
        match *event {
            ZoneEvent::ZoneActivated { zone } => ZoneEventDto::ZoneActivated { zone: zone.into() },
            ZoneEvent::CountdownTick { seconds_remaining } => {
                ZoneEventDto::CountdownTick { seconds_remaining }
            }
            ZoneEvent::ContestStarted {
                zone,
                player_id,
                team,
            } => ZoneEventDto::ContestStarted {
                zone: zone.into(),
                player_id: player_id.to_string(),
                team: team.into(),
            },
            ZoneEvent::ContestTick {
                zone,
                team,
                seconds_left,
                fill,
            } => ZoneEventDto::ContestTick {
                zone: zone.into(),
                team: team.into(),
                seconds_left,
                fill,
            },
            ZoneEvent::ContestStopped { zone } => ZoneEventDto::ContestStopped { zone: zone.into() },
            ZoneEvent::ContestResolved {
                zone,
                player_id,
                team,
            } => ZoneEventDto::ContestResolved {
                zone: zone.into(),
                player_id: player_id.to_string(),
                team: team.into(),
            },
            ZoneEvent::ScoreChanged { team, zone, score } => ZoneEventDto::ScoreChanged {
                team: team.into(),
                zone: zone.into(),
                slot: zone.slot() as u8,
                score,
            },
            ZoneEvent::ZoneFullyCaptured { zone, team } => ZoneEventDto::ZoneFullyCaptured {
                zone: zone.into(),
                team: team.into(),
            },
            ZoneEvent::MatchWon { team } => ZoneEventDto::MatchWon { team: team.into() },
        }
    }
}

/// Point-in-time copy of one zone for wire transmission.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneSnapshotDto {
    pub zone: ZoneIdDto,
    pub active: bool,
    pub contested: bool,
    pub fully_captured: bool,
    pub owner: Option<TeamDto>,
    pub score_red: u32,
    pub score_blue: u32,
}

impl From<&ZoneSnapshot> for ZoneSnapshotDto {
    fn from(zone: &ZoneSnapshot) -> Self {
        Self {
            zone: zone.zone.into(),
            active: zone.active,
            contested: zone.contested,
            fully_captured: zone.fully_captured,
            owner: zone.owner.map(TeamDto::from),
            score_red: zone.score_red,
            score_blue: zone.score_blue,
        }
    }
}

/// Running contest details included in snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct ContestSnapshotDto {
    pub zone: ZoneIdDto,
    pub player_id: String,
    pub team: TeamDto,
    pub seconds_left: f32,
    pub fill: f32,
}

impl From<&ContestSnapshot> for ContestSnapshotDto {
    fn from(contest: &ContestSnapshot) -> Self {
        Self {
            zone: contest.zone.into(),
            player_id: contest.player_id.to_string(),
            team: contest.team.into(),
            seconds_left: contest.seconds_left,
            fill: contest.fill,
        }
    }
}

/// Full match state sent to late joiners and lagged clients.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSnapshotDto {
    pub zones: Vec<ZoneSnapshotDto>,
    pub active_zone: Option<ZoneIdDto>,
    pub countdown_remaining: f32,
    pub contest: Option<ContestSnapshotDto>,
    pub winner: Option<TeamDto>,
}

impl From<&MatchSnapshot> for MatchSnapshotDto {
    fn from(snapshot: &MatchSnapshot) -> Self {
        Self {
            zones: snapshot.zones.iter().map(ZoneSnapshotDto::from).collect(),
            active_zone: snapshot.active_zone.map(ZoneIdDto::from),
            countdown_remaining: snapshot.countdown_remaining,
            contest: snapshot.contest.as_ref().map(ContestSnapshotDto::from),
            winner: snapshot.winner.map(TeamDto::from),
        }
    }
}

/// Server lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum ServerStateDto {
    Lobby,
    MatchStarting { in_seconds: u32 },
    MatchRunning,
    MatchEnded,
}

impl From<ServerState> for ServerStateDto {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Lobby => ServerStateDto::Lobby,
            ServerState::MatchStarting { in_seconds } => {
                ServerStateDto::MatchStarting { in_seconds }
            }
            ServerState::MatchRunning => ServerStateDto::MatchRunning,
            ServerState::MatchEnded => ServerStateDto::MatchEnded,
        }
    }
}

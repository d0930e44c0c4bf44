// Match orchestration: spawning authoritative match tasks and wiring the
// channels each connection needs to feed and observe one.

use crate::domain::state::MatchSnapshot;
use crate::domain::{Team, ZoneTuning};
use crate::use_cases::game::match_task;
use crate::use_cases::{MatchEvent, MatchUpdate, ServerState};
use axum::extract::ws::Utf8Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock, broadcast, mpsc, watch};
use tracing::{info, warn};

/// Shared configuration applied to every match the registry spawns.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Capacity for inbound player events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast match updates.
    pub update_broadcast_capacity: usize,
    /// Fixed tick interval for the match loop.
    pub tick_interval: Duration,
    /// Gameplay numbers handed to each match's zone manager.
    pub tuning: ZoneTuning,
    /// How long an ended match lingers so clients can show the result.
    pub end_linger: Duration,
}

/// Errors returned by match registry operations.
#[derive(Debug)]
pub enum MatchError {
    /// Match already exists and cannot be re-created.
    AlreadyExists,
}

/// Live socket owning a player slot. A newer connection for the same player
/// replaces the old one via its shutdown notify.
struct PlayerConn {
    token: u64,
    shutdown: Arc<Notify>,
}

/// Per-match channels and access rules handed to each connection.
#[derive(Clone)]
pub struct MatchHandle {
    /// Identifier clients use to target this match.
    pub match_id: Arc<str>,
    /// Sender for player events into the match task.
    pub input_tx: mpsc::Sender<MatchEvent>,
    /// Broadcast sender for raw match updates.
    pub update_tx: broadcast::Sender<MatchUpdate>,
    /// Broadcast sender for serialized match updates.
    pub update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest full snapshot (domain form).
    pub snapshot_tx: watch::Sender<MatchSnapshot>,
    /// Watch sender holding the latest serialized snapshot, used to seed
    /// late joiners and to resync lagged clients.
    pub snapshot_latest_tx: watch::Sender<Utf8Bytes>,
    /// Watch sender for high-level server state changes.
    pub server_state_tx: watch::Sender<ServerState>,
    /// Players allowed to take part (empty means open match).
    allowed_players: Arc<HashSet<u64>>,
    /// Teams forced by the creating service; everyone else picks at join.
    team_assignments: Arc<HashMap<u64, Team>>,
    /// Live connection per player id, newest wins.
    player_conns: Arc<Mutex<HashMap<u64, PlayerConn>>>,
}

impl MatchHandle {
    /// Returns true if the provided player id may take part in the match.
    pub fn is_player_allowed(&self, player_id: u64) -> bool {
        self.allowed_players.is_empty() || self.allowed_players.contains(&player_id)
    }

    /// Team the creating service pinned this player to, if any.
    pub fn assigned_team(&self, player_id: u64) -> Option<Team> {
        self.team_assignments.get(&player_id).copied()
    }

    /// Claim the player slot for a new connection, kicking any previous
    /// connection holding it. Returns the notify the new connection must
    /// watch for its own replacement.
    pub async fn register_or_replace_player_connection(
        &self,
        player_id: u64,
        token: u64,
    ) -> Arc<Notify> {
        let mut conns = self.player_conns.lock().await;
        if let Some(previous) = conns.remove(&player_id) {
            info!(player_id, "replacing existing player connection");
            previous.shutdown.notify_one();
        }
        let shutdown = Arc::new(Notify::new());
        conns.insert(
            player_id,
            PlayerConn {
                token,
                shutdown: shutdown.clone(),
            },
        );
        shutdown
    }

    /// Release the player slot, but only if `token` still owns it. Returns
    /// whether this connection was the owner, so callers know if the player
    /// should be despawned or has already been taken over.
    pub async fn unregister_player_connection_if_owner(&self, player_id: u64, token: u64) -> bool {
        let mut conns = self.player_conns.lock().await;
        if conns.get(&player_id).is_some_and(|c| c.token == token) {
            conns.remove(&player_id);
            true
        } else {
            false
        }
    }
}

struct MatchEntry {
    handle: MatchHandle,
    shutdown: Arc<Notify>,
    connections: usize,
    pinned: bool,
}

/// Thread-safe registry for active matches.
pub struct MatchRegistry {
    /// Global settings applied to newly created matches.
    settings: MatchSettings,
    /// Map of match id to active entry.
    matches: RwLock<HashMap<String, MatchEntry>>,
}

impl MatchRegistry {
    /// Creates a new registry with the provided settings.
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            matches: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new match and spawns its authoritative task. A pinned match
    /// is never removed, even once empty or ended.
    pub async fn create_match(
        &self,
        match_id: String,
        allowed_players: HashSet<u64>,
        team_assignments: HashMap<u64, Team>,
        pinned: bool,
    ) -> Result<MatchHandle, MatchError> {
        let mut matches = self.matches.write().await;
        if matches.contains_key(&match_id) {
            return Err(MatchError::AlreadyExists);
        }

        // Channel wiring for the match loop.
        let (input_tx, input_rx) =
            mpsc::channel::<MatchEvent>(self.settings.input_channel_capacity);
        let (update_tx, _update_rx) =
            broadcast::channel::<MatchUpdate>(self.settings.update_broadcast_capacity);
        let (update_bytes_tx, _update_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.update_broadcast_capacity);
        let (snapshot_tx, _snapshot_rx) = watch::channel::<MatchSnapshot>(MatchSnapshot::empty());
        let (snapshot_latest_tx, _snapshot_latest_rx) =
            watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (server_state_tx, _server_state_rx) = watch::channel::<ServerState>(ServerState::Lobby);
        let shutdown = Arc::new(Notify::new());

        // Spawn the authoritative zone loop for this match.
        tokio::spawn(match_task(
            input_rx,
            update_tx.clone(),
            snapshot_tx.clone(),
            server_state_tx.clone(),
            self.settings.tick_interval,
            self.settings.tuning,
            shutdown.clone(),
        ));

        let handle = MatchHandle {
            match_id: Arc::from(match_id.clone()),
            input_tx,
            update_tx,
            update_bytes_tx,
            snapshot_tx,
            snapshot_latest_tx,
            server_state_tx,
            allowed_players: Arc::new(allowed_players),
            team_assignments: Arc::new(team_assignments),
            player_conns: Arc::new(Mutex::new(HashMap::new())),
        };

        info!(match_id = %match_id, pinned, "match created");
        matches.insert(
            match_id,
            MatchEntry {
                handle: handle.clone(),
                shutdown,
                connections: 0,
                pinned,
            },
        );
        Ok(handle)
    }

    /// Returns a match handle for the provided id, if it exists.
    pub async fn get_match(&self, match_id: &str) -> Option<MatchHandle> {
        let matches = self.matches.read().await;
        matches.get(match_id).map(|entry| entry.handle.clone())
    }

    /// Count a new socket against the match. Returns the updated connection
    /// count, or `None` if the match disappeared in the meantime.
    pub async fn register_connection(&self, match_id: &str) -> Option<usize> {
        let mut matches = self.matches.write().await;
        let entry = matches.get_mut(match_id)?;
        entry.connections += 1;
        Some(entry.connections)
    }

    /// Count a socket closing. The last disconnect removes a non-pinned
    /// match outright; spectators keep matches alive by policy, so every
    /// socket counts.
    pub async fn register_disconnect(&self, match_id: &str) {
        let mut matches = self.matches.write().await;
        let Some(entry) = matches.get_mut(match_id) else {
            return;
        };
        entry.connections = entry.connections.saturating_sub(1);
        if entry.connections == 0 && !entry.pinned {
            if let Some(entry) = matches.remove(match_id) {
                info!(match_id, "removing empty match");
                entry.shutdown.notify_one();
            }
        }
    }

    /// Remove a match and stop its task, regardless of connection count.
    pub async fn remove_match(&self, match_id: &str) {
        let mut matches = self.matches.write().await;
        if let Some(entry) = matches.remove(match_id) {
            info!(match_id, "match removed");
            entry.shutdown.notify_one();
        }
    }

    /// Watch a match's server state and clean it up once the match has
    /// ended and the result has had time to reach clients. Connected
    /// sockets extend the lifetime; the last disconnect then removes it.
    pub fn spawn_match_end_watcher(
        self: Arc<Self>,
        match_id: Arc<str>,
        mut server_state_rx: watch::Receiver<ServerState>,
    ) {
        let linger = self.settings.end_linger;
        tokio::spawn(async move {
            loop {
                if *server_state_rx.borrow() == ServerState::MatchEnded {
                    break;
                }
                if server_state_rx.changed().await.is_err() {
                    // Match task gone; nothing left to watch.
                    return;
                }
            }
            tokio::time::sleep(linger).await;

            let mut matches = self.matches.write().await;
            match matches.get(match_id.as_ref()) {
                Some(entry) if entry.pinned => {}
                Some(entry) if entry.connections > 0 => {
                    // The last disconnect will remove it instead.
                    warn!(match_id = %match_id, "ended match still has connections; deferring removal");
                }
                Some(_) => {
                    if let Some(entry) = matches.remove(match_id.as_ref()) {
                        info!(match_id = %match_id, "removing ended match");
                        entry.shutdown.notify_one();
                    }
                }
                None => {}
            }
        });
    }
}

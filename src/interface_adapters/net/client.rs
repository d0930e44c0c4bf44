use crate::domain::Team;
use crate::domain::state::MatchSnapshot;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    ClientMessage, MatchSnapshotDto, MatchUpdateDto, PresenceKindDto, ServerMessage,
    ZonePresenceDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{MatchEvent, MatchHandle, MatchRegistry, MatchUpdate, ServerState};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch::Receiver;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Connection lifecycle failures; the variant picks the close policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    MatchUpdatesClosed,
    ServerStateClosed,
    JoinRequired,
    JoinTimeout,
    InvalidJoin,
    ClosedBeforeJoin,
}

#[derive(Debug, serde::Deserialize)]
pub struct MatchQuery {
    // The match id the client wants to observe or play in.
    #[serde(default)]
    match_id: Option<String>,
}

/// Serialize each authoritative output once and share the bytes with every
/// connection: updates fan out on a broadcast channel, the latest full
/// snapshot sits in a watch channel for late joiners and lag recovery.
pub async fn match_update_serializer(
    mut update_rx: broadcast::Receiver<MatchUpdate>,
    mut snapshot_rx: watch::Receiver<MatchSnapshot>,
    update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    snapshot_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        tokio::select! {
            update = update_rx.recv() => match update {
                Ok(update) => {
                    let msg = ServerMessage::MatchUpdate(MatchUpdateDto::from(update));
                    let txt = match serde_json::to_string(&msg) {
                        Ok(txt) => txt,
                        Err(e) => {
                            error!(error = ?e, "failed to serialize match update");
                            continue;
                        }
                    };
                    // Convert once and broadcast shared UTF-8 bytes to all clients.
                    let _ = update_bytes_tx.send(Utf8Bytes::from(txt));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        missed = n,
                        "update serializer lagged; skipping to latest update"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("match updates channel closed; serializer exiting");
                    break;
                }
            },
            changed = snapshot_rx.changed() => match changed {
                Ok(()) => {
                    let msg = {
                        let snapshot = snapshot_rx.borrow_and_update();
                        ServerMessage::Snapshot(MatchSnapshotDto::from(&*snapshot))
                    };
                    let txt = match serde_json::to_string(&msg) {
                        Ok(txt) => txt,
                        Err(e) => {
                            error!(error = ?e, "failed to serialize match snapshot");
                            continue;
                        }
                    };
                    // Keep only the newest snapshot; stale ones have no takers.
                    let _ = snapshot_latest_tx.send(Utf8Bytes::from(txt));
                }
                Err(_) => {
                    // Match task dropped its snapshot sender; nothing left to do.
                    break;
                }
            },
        }
    }
}

pub fn spawn_match_serializer(handle: &MatchHandle) {
    // Spawn a task that serializes updates and snapshots for this match.
    tokio::spawn(match_update_serializer(
        handle.update_tx.subscribe(),
        handle.snapshot_tx.subscribe(),
        handle.update_bytes_tx.clone(),
        handle.snapshot_latest_tx.clone(),
    ));
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchQuery>,
) -> impl IntoResponse {
    let match_id = query
        .match_id
        .unwrap_or_else(|| state.default_match_id.to_string());

    let handle = match state.match_registry.get_match(&match_id).await {
        Some(handle) => handle,
        None => {
            // Unknown match ids get the JSON error shape, not a bare status.
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("match not found")),
            )
                .into_response();
        }
    };

    let match_registry = state.match_registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, handle, match_registry))
}

async fn handle_socket(
    mut socket: WebSocket,
    handle: MatchHandle,
    match_registry: Arc<MatchRegistry>,
) {
    // Connection-scoped id so logs correlate before a player_id is known.
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &handle, match_registry.clone()).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    // Register the connection so the match stays alive while sockets are active.
    if match_registry
        .register_connection(&ctx.match_id)
        .await
        .is_none()
    {
        // The match can be removed between lookup and registration during shutdown.
        warn!(match_id = %ctx.match_id, "match missing during connection registration");
        // Best-effort cleanup in case the match was removed after bootstrap.
        let was_owner = ctx
            .handle
            .unregister_player_connection_if_owner(ctx.player_id, ctx.player_conn_token)
            .await;
        if ctx.can_spawn && was_owner {
            let _ = ctx
                .input_tx
                .send(MatchEvent::Leave {
                    player_id: ctx.player_id,
                })
                .await;
        }
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "match unavailable".into(),
            })))
            .await;
        let _ = socket.close().await;
        return;
    }
    ctx.registered = true;

    span.record("player_id", ctx.player_id);
    info!(
        player_id = ctx.player_id,
        team = %ctx.team,
        display_name = %ctx.display_name,
        "client connected"
    );

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: u64,
    pub team: Team,
    pub display_name: String,
    // Match id this connection is attached to.
    pub match_id: Arc<str>,
    // Registry handle for the connection counter.
    pub match_registry: Arc<MatchRegistry>,
    // Match handle for per-player connection ownership cleanup.
    pub handle: MatchHandle,
    // Proof of slot ownership for the cleanup path.
    pub player_conn_token: u64,
    // Fires when a newer connection takes this player's slot.
    pub player_conn_shutdown: Arc<Notify>,
    // Whether the connection has been registered in the match counter.
    pub registered: bool,
    pub input_tx: mpsc::Sender<MatchEvent>,
    pub update_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub snapshot_latest_rx: watch::Receiver<Utf8Bytes>,
    pub server_state_rx: watch::Receiver<ServerState>,
    pub can_spawn: bool,
    // Snapshots sent to dig this client out of broadcast lag.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_event_full_log: Instant,
    pub last_update_lag_log: Instant,
    pub last_invalid_msg_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    claimed_player_id: Option<u64>,
    requested_team: Team,
    display_name: String,
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    handle: &MatchHandle,
    match_registry: Arc<MatchRegistry>,
) -> Result<ConnCtx, NetError> {
    // Subscribe before the first await so no update slips past the handshake.
    let update_bytes_rx = handle.update_bytes_tx.subscribe();
    let snapshot_latest_rx = handle.snapshot_latest_tx.subscribe();
    let server_state_rx = handle.server_state_tx.subscribe();

    // The very first meaningful client message must be a Join.
    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // Players created by the match service arrive with their pre-assigned id;
    // everyone else gets a fresh one.
    let player_id = join.claimed_player_id.unwrap_or_else(rand_id);
    // A service-side team assignment beats whatever the client asked for.
    let team = handle
        .assigned_team(player_id)
        .unwrap_or(join.requested_team);

    // Slot token: a newer connection for the same player replaces this one.
    let player_conn_token = rand_id();
    let player_conn_shutdown = handle
        .register_or_replace_player_connection(player_id, player_conn_token)
        .await;

    // Confirm the resolved identity back to the client first.
    let identity_msg = ServerMessage::Identity {
        player_id: player_id.to_string(),
        team: team.into(),
    };
    if let Err(err) = send_message(socket, &identity_msg).await {
        // Free the slot again if the handshake dies this early.
        handle
            .unregister_player_connection_if_owner(player_id, player_conn_token)
            .await;
        return Err(err);
    }

    // Only allow playing if the match explicitly allows this player id.
    let can_spawn = handle.is_player_allowed(player_id);

    if can_spawn {
        // Put the player on the match roster. Join goes in before the initial
        // snapshot read so that snapshot can already include them.
        // If anything after Join fails, compensate with Leave to avoid
        // "joined but never connected".
        if let Err(err) = handle
            .input_tx
            .send(MatchEvent::Join {
                player_id,
                team,
                display_name: join.display_name.clone(),
            })
            .await
            .map_err(|_| NetError::InputClosed)
        {
            handle
                .unregister_player_connection_if_owner(player_id, player_conn_token)
                .await;
            return Err(err);
        }
    }

    // Current lifecycle state first, then the latest zone snapshot so a late
    // joiner renders the match without replaying history. Clone out of the
    // watch borrow before any await.
    let initial_state = server_state_rx.borrow().clone();
    let state_msg = ServerMessage::GameState(initial_state.into());
    let mut seed_result = send_message(socket, &state_msg).await.map(|_| ());
    if seed_result.is_ok() {
        let latest_snapshot = snapshot_latest_rx.borrow().clone();
        if !latest_snapshot.is_empty() {
            seed_result = socket
                .send(Message::Text(latest_snapshot))
                .await
                .map_err(NetError::Ws);
        }
    }
    if let Err(e) = seed_result {
        if can_spawn {
            handle
                .input_tx
                .send(MatchEvent::Leave { player_id })
                .await
                .map_err(|_| NetError::InputClosed)?; // InputClosed takes precedence
        }
        handle
            .unregister_player_connection_if_owner(player_id, player_conn_token)
            .await;
        return Err(e);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        team,
        display_name: join.display_name,
        match_id: handle.match_id.clone(),
        match_registry,
        handle: handle.clone(),
        player_conn_token,
        player_conn_shutdown,
        registered: false,
        input_tx: handle.input_tx.clone(),
        update_bytes_rx,
        snapshot_latest_rx,
        server_state_rx,
        can_spawn,
        lag_recovery_count: 0,

        msgs_in: join.msgs_in,
        msgs_out: 0,
        bytes_in: join.bytes_in,
        bytes_out: 0,

        invalid_json: 0,

        last_event_full_log: now,
        last_update_lag_log: now,
        last_invalid_msg_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 32;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let parsed = serde_json::from_str::<ClientMessage>(&text);
                let payload = match parsed {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(ClientMessage::Zone(_)) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let display_name = payload.display_name.trim();
                if display_name.is_empty() || display_name.len() > MAX_DISPLAY_NAME_LEN {
                    let _ =
                        send_close_with_reason(socket, close_code::POLICY, "invalid display name")
                            .await;
                    return Err(NetError::InvalidJoin);
                }

                return Ok(JoinHandshake {
                    claimed_player_id: payload.player_id,
                    requested_team: payload.team.into(),
                    display_name: display_name.to_string(),
                    bytes_in,
                    msgs_in: 1,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

// Forward a zone presence transition into the match loop.
fn process_zone_message(
    player_id: u64,
    input_tx: &mpsc::Sender<MatchEvent>,
    presence: ZonePresenceDto,
    last_event_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    let event = match presence.kind {
        PresenceKindDto::Entered => MatchEvent::ZoneEntered {
            player_id,
            zone: presence.zone.into(),
        },
        PresenceKindDto::Exited => MatchEvent::ZoneExited {
            player_id,
            zone: presence.zone.into(),
        },
    };

    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(tokio::sync::mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_event_full_log) {
                warn!(player_id, "input channel full; dropping zone event");
            }
            Ok(LoopControl::Continue)
        }
        Err(tokio::sync::mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Borrow the fields separately so the select arms can share them.
    let ConnCtx {
        match_id,
        match_registry,
        handle,
        player_conn_token,
        player_conn_shutdown,
        registered,
        input_tx,
        update_bytes_rx,
        snapshot_latest_rx,
        server_state_rx,
        can_spawn,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_event_full_log,
        last_update_lag_log,
        last_invalid_msg_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // Every arm reports whether the session should end.
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    input_tx,
                    *can_spawn,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_event_full_log,
                    last_invalid_msg_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            update_msg = update_bytes_rx.recv() => {
                match update_msg {
                    Ok(bytes) => match forward_update_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_update_lag_log) {
                            warn!(missed = n, "match updates lagged; sending snapshot");
                        }

                        // Skip the missed updates; one full snapshot resyncs.
                        let latest = snapshot_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            if should_log(last_update_lag_log) {
                                warn!("snapshot unavailable during lag recovery");
                            }
                            false
                        } else {
                            let bytes_len = latest.len();
                            *lag_recovery_count += 1;
                            let outcome =
                                forward_update_bytes(latest, socket, msgs_out, bytes_out).await;

                            if should_log(last_update_lag_log) {
                                debug!(
                                    player_id,
                                    bytes = bytes_len,
                                    count = *lag_recovery_count,
                                    "sent lag recovery snapshot"
                                );
                            }

                            match outcome {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::MatchUpdatesClosed);
                        true
                    }
                }
            }

            changed_state = server_state_rx.changed() => {
                match changed_state {
                    Ok(()) => match forward_server_state(server_state_rx, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(_) => {
                        warn!(player_id, "server state channel closed; disconnecting");
                        fatal = Some(NetError::ServerStateClosed);
                        true
                    }
                }
            }

            // A newer socket claimed this player's slot; tell the old client
            // why it is going away.
            _ = player_conn_shutdown.notified() => {
                *close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "connection replaced".into(),
                });
                info!(player_id, "connection replaced by newer session");
                true
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(
        player_id,
        match_id,
        match_registry,
        handle,
        *player_conn_token,
        *registered,
        input_tx,
        *can_spawn,
        *msgs_in,
        *msgs_out,
        *bytes_in,
        *bytes_out,
        *invalid_json,
        *lag_recovery_count,
    )
    .await
    {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    input_tx: &mpsc::Sender<MatchEvent>,
    can_spawn: bool,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_event_full_log: &mut Instant,
    last_invalid_msg_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // A second Join cannot re-team a live session; drop it.
                        if should_log(last_invalid_msg_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Zone(presence)) => {
                        if !can_spawn {
                            // Spectators observe; their zone events must never
                            // reach the authoritative match state.
                            if should_log(last_invalid_msg_log) {
                                warn!(player_id, "spectator zone event ignored");
                            }
                            return Ok(LoopControl::Continue);
                        }

                        process_zone_message(player_id, input_tx, presence, last_event_full_log)
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_msg_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_update_bytes(
    update_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = update_msg.len();
    match socket
        .send(Message::Text(update_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // The loop tears the session down right after this.
            warn!(error = ?err, "failed to send match update");
            LoopControl::Disconnect
        }
    }
}

async fn forward_server_state(
    server_state_rx: &Receiver<ServerState>,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let st = server_state_rx.borrow().clone();
    let msg = ServerMessage::GameState(st.into());
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send server state");
            LoopControl::Disconnect
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn disconnect_cleanup(
    player_id: u64,
    match_id: &Arc<str>,
    match_registry: &Arc<MatchRegistry>,
    handle: &MatchHandle,
    player_conn_token: u64,
    registered: bool,
    input_tx: &mpsc::Sender<MatchEvent>,
    can_spawn: bool,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    lag_recovery_count: u64,
) -> Result<(), NetError> {
    // Release the player slot first; a replaced connection must not despawn
    // the player its successor now controls.
    let was_owner = handle
        .unregister_player_connection_if_owner(player_id, player_conn_token)
        .await;

    if can_spawn && was_owner {
        // Only remove players that actually joined and still own their slot.
        input_tx
            .send(MatchEvent::Leave { player_id })
            .await
            .map_err(|_| NetError::InputClosed)?;
    }

    if registered {
        // Spectators keep matches alive by policy, so count every socket.
        match_registry.register_disconnect(match_id).await;
    }

    debug!(
        player_id,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    Ok(())
}

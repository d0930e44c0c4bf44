use super::types::{MatchEvent, MatchUpdate, ServerState};
use crate::domain::state::MatchSnapshot;
use crate::domain::systems::{ZoneManager, ZoneSensors};
use crate::domain::{Role, ZoneTuning};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{info, warn};

// Clamp for per-tick elapsed time so a stalled task cannot fast-forward the
// zone timers when it wakes back up.
const MAX_TICK_DELTA: f32 = 0.25;

/// Authoritative match loop. The only task that mutates zone state; every
/// other peer consumes the `MatchUpdate` stream and the snapshot watch.
pub async fn match_task(
    mut input_rx: mpsc::Receiver<MatchEvent>,
    update_tx: broadcast::Sender<MatchUpdate>,
    snapshot_tx: watch::Sender<MatchSnapshot>,
    server_state_tx: watch::Sender<ServerState>,
    tick_interval: Duration,
    tuning: ZoneTuning,
    shutdown: Arc<tokio::sync::Notify>,
) {
    let mut tick: u64 = 0;
    let mut manager = ZoneManager::new(Role::Authority, tuning);
    let mut sensors = ZoneSensors::default();
    let mut match_ended = false;

    let _ = server_state_tx.send(ServerState::MatchStarting { in_seconds: 3 });
    tokio::time::sleep(Duration::from_secs(3)).await;
    let _ = server_state_tx.send(ServerState::MatchRunning);
    manager.start();

    // Drive the fixed-step match loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the match is removed.
                break;
            }
            _ = interval.tick() => {}
        }

        // Zone timers consume wall-clock time, not tick counts, so a missed
        // interval slot never shortens a capture window.
        let dt = last_tick.elapsed().as_secs_f32().min(MAX_TICK_DELTA);
        last_tick = Instant::now();

        while let Ok(ev) = input_rx.try_recv() {
            match ev {
                MatchEvent::Join {
                    player_id,
                    team,
                    display_name,
                } => {
                    manager.add_player(player_id, team, display_name);
                }
                MatchEvent::Leave { player_id } => {
                    // Force zone exits first so a leaving claimant stops the
                    // contest through the same path a walk-out would.
                    sensors.remove_player(&mut manager, player_id);
                    manager.remove_player(player_id);
                }
                MatchEvent::ZoneEntered { player_id, zone } => {
                    match manager.player_team(player_id) {
                        Some(team) => sensors.on_enter(&mut manager, zone, player_id, team),
                        None => warn!(player_id, zone = %zone, "zone enter for unknown player"),
                    }
                }
                MatchEvent::ZoneExited { player_id, zone } => {
                    match manager.player_team(player_id) {
                        Some(team) => sensors.on_exit(&mut manager, zone, player_id, team),
                        None => warn!(player_id, zone = %zone, "zone exit for unknown player"),
                    }
                }
            }
        }

        // Re-evaluate presence for everyone still standing in a zone, then
        // advance the countdown/contest/ownership timers.
        sensors.tick(&mut manager);
        manager.tick(dt);

        tick += 1;
        for event in manager.take_events() {
            let _ = update_tx.send(MatchUpdate { tick, event });
        }
        let _ = snapshot_tx.send(manager.snapshot());

        if !match_ended {
            if let Some(winner) = manager.winner() {
                match_ended = true;
                info!(winner = %winner, "match ended");
                let _ = server_state_tx.send(ServerState::MatchEnded);
            }
        }
    }
}

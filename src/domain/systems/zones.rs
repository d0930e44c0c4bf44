// Authoritative zone state machine: rotation, countdown, contest resolution,
// ownership accumulation and win detection. One instance per match; every
// shared counter is advanced here and nowhere else.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::domain::state::{
    ContestSnapshot, MatchSnapshot, PlayerState, Role, Team, Zone, ZoneEvent, ZoneId, ZoneSnapshot,
};
use crate::domain::timer::{SecondTicker, TaskSlot};
use crate::domain::tuning::ZoneTuning;

/// Active-window countdown. Ticks only while no contest is resolving, so a
/// zone cannot rotate away mid-capture.
#[derive(Debug)]
struct CountdownTask {
    remaining: f32,
}

/// A running contest: one claimant holding the zone for the capture window.
#[derive(Debug)]
struct ContestTask {
    zone: ZoneId,
    player_id: u64,
    team: Team,
    remaining: f32,
    fill: f32,
    ticker: SecondTicker,
}

/// Once-per-second ownership ticks for a contested zone. Stalls (keeps the
/// slot, makes no progress) whenever its zone is not the eligible active zone.
#[derive(Debug)]
struct OwnershipTask {
    team: Team,
    ticker: SecondTicker,
}

impl OwnershipTask {
    fn new(team: Team) -> Self {
        Self {
            team,
            ticker: SecondTicker::default(),
        }
    }
}

/// Single owner of all mutable zone state for a match.
///
/// Constructed with a fixed [`Role`]; an observer-role manager refuses every
/// mutation and logs the attempt, matching the single-authority model. The
/// caller drains [`ZoneEvent`]s after each mutation via
/// [`ZoneManager::take_events`] and broadcasts them in order.
pub struct ZoneManager {
    role: Role,
    tuning: ZoneTuning,
    zones: [Zone; 3],
    players: HashMap<u64, PlayerState>,
    /// Rotation cursor; meaningful once `started`.
    current: ZoneId,
    countdown: TaskSlot<CountdownTask>,
    contest: TaskSlot<ContestTask>,
    ownership: [TaskSlot<OwnershipTask>; 3],
    /// Last resolved claim per team, consulted (Red first) when the rotation
    /// revisits a contested zone to resume its ownership ticks.
    last_claim_red: Option<(u64, ZoneId)>,
    last_claim_blue: Option<(u64, ZoneId)>,
    winner: Option<Team>,
    started: bool,
    events: Vec<ZoneEvent>,
}

impl ZoneManager {
    pub fn new(role: Role, tuning: ZoneTuning) -> Self {
        Self {
            role,
            tuning,
            zones: Default::default(),
            players: HashMap::new(),
            current: ZoneId::A,
            countdown: TaskSlot::default(),
            contest: TaskSlot::default(),
            ownership: Default::default(),
            last_claim_red: None,
            last_claim_blue: None,
            winner: None,
            started: false,
            events: Vec::new(),
        }
    }

    // ---- mutating entry points -------------------------------------------

    /// Begin the rotation by activating the first capturable zone.
    pub fn start(&mut self) {
        if !self.ensure_authority("start") {
            return;
        }
        if self.winner.is_some() {
            return;
        }
        if self.started {
            warn!("zone rotation already started");
            return;
        }
        self.started = true;
        self.activate(ZoneId::A);
    }

    /// Advance every live timer by `dt` seconds of wall-clock time.
    ///
    /// Silent no-op off-authority and after the match is decided; the per-tick
    /// call volume makes the usual logged rejection pure noise here.
    pub fn tick(&mut self, dt: f32) {
        if !self.role.is_authority() || self.winner.is_some() || !self.started {
            return;
        }
        if self.contest.is_live() {
            self.tick_contest(dt);
        } else {
            self.tick_countdown(dt);
        }
        if self.winner.is_some() {
            return;
        }
        self.tick_ownership(dt);
    }

    /// Begin a contest for `zone` on behalf of `player_id`.
    ///
    /// Only one contest may run match-wide; a second start anywhere is
    /// ignored until the first resolves or is stopped.
    pub fn start_contest(&mut self, player_id: u64, zone: ZoneId) {
        if !self.ensure_authority("start_contest") {
            return;
        }
        if self.winner.is_some() {
            return;
        }
        if self.contest.is_live() {
            debug!(zone = %zone, player_id, "contest already running, ignoring start");
            return;
        }
        let Some(team) = self.players.get(&player_id).map(|p| p.team) else {
            warn!(player_id, zone = %zone, "unknown player tried to start a contest");
            return;
        };
        self.contest.replace(ContestTask {
            zone,
            player_id,
            team,
            remaining: self.tuning.capture_duration,
            fill: 0.0,
            ticker: SecondTicker::default(),
        });
        info!(zone = %zone, player_id, team = %team, "contest started");
        self.events.push(ZoneEvent::ContestStarted {
            zone,
            player_id,
            team,
        });
    }

    /// Cancel the contest running on `zone`, if any. Resets the capture bar;
    /// leaves earlier `contested` results and ownership ticks untouched.
    pub fn stop_contest(&mut self, zone: ZoneId) {
        if !self.ensure_authority("stop_contest") {
            return;
        }
        if self.winner.is_some() {
            return;
        }
        if !self.contest.get().is_some_and(|t| t.zone == zone) {
            debug!(zone = %zone, "no contest running here, ignoring stop");
            return;
        }
        self.contest.cancel();
        info!(zone = %zone, "contest stopped");
        self.events.push(ZoneEvent::ContestStopped { zone });
    }

    pub fn add_player(&mut self, player_id: u64, team: Team, display_name: impl Into<String>) {
        if !self.ensure_authority("add_player") {
            return;
        }
        if self.winner.is_some() {
            return;
        }
        let display_name = display_name.into();
        info!(player_id, team = %team, name = %display_name, "player joined match roster");
        if self
            .players
            .insert(player_id, PlayerState::new(team, display_name))
            .is_some()
        {
            warn!(player_id, "replaced existing roster entry");
        }
    }

    /// Drop a player from the roster. A claimant leaving cancels their
    /// contest; their stale last-claim register simply never resumes.
    pub fn remove_player(&mut self, player_id: u64) {
        if !self.ensure_authority("remove_player") {
            return;
        }
        if self.winner.is_some() {
            return;
        }
        if self.players.remove(&player_id).is_none() {
            return;
        }
        info!(player_id, "player left match roster");
        let claimed = self
            .contest
            .get()
            .and_then(|t| (t.player_id == player_id).then_some(t.zone));
        if let Some(zone) = claimed {
            self.stop_contest(zone);
        }
    }

    /// Drain the events produced since the previous call, in mutation order.
    pub fn take_events(&mut self) -> Vec<ZoneEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- tick phases ------------------------------------------------------

    fn tick_contest(&mut self, dt: f32) {
        let finished = match self.contest.get_mut() {
            Some(task) => {
                task.remaining -= dt;
                for _ in 0..task.ticker.advance(dt) {
                    task.fill = (task.fill + self.tuning.fill_per_second).min(1.0);
                }
                self.events.push(ZoneEvent::ContestTick {
                    zone: task.zone,
                    team: task.team,
                    seconds_left: task.remaining.max(0.0),
                    fill: task.fill,
                });
                task.remaining <= 0.0
            }
            None => false,
        };
        if finished {
            if let Some(task) = self.contest.cancel() {
                self.resolve_contest(task);
            }
        }
    }

    /// A claimant held the zone for the full capture window.
    fn resolve_contest(&mut self, task: ContestTask) {
        let ContestTask {
            zone,
            player_id,
            team,
            ..
        } = task;
        {
            let z = &mut self.zones[zone.slot()];
            z.contested = true;
            z.owner_of_last_contest = Some(team);
        }
        match team {
            Team::Red => self.last_claim_red = Some((player_id, zone)),
            Team::Blue => self.last_claim_blue = Some((player_id, zone)),
        }
        // The personal claim is exclusive: strip it from everyone, then grant
        // it to the winning claimant.
        for player in self.players.values_mut() {
            player.claimed_zones.remove(&zone);
        }
        if let Some(player) = self.players.get_mut(&player_id) {
            player.claimed_zones.insert(zone);
        }
        self.ownership[zone.slot()].replace(OwnershipTask::new(team));
        info!(zone = %zone, player_id, team = %team, "contest resolved");
        self.events.push(ZoneEvent::ContestResolved {
            zone,
            player_id,
            team,
        });
    }

    fn tick_countdown(&mut self, dt: f32) {
        let expired = match self.countdown.get_mut() {
            Some(task) => {
                task.remaining -= dt;
                self.events.push(ZoneEvent::CountdownTick {
                    seconds_remaining: task.remaining.max(0.0),
                });
                task.remaining <= 0.0
            }
            None => false,
        };
        if expired {
            self.countdown.cancel();
            self.ownership[self.current.slot()].cancel();
            let next = self.current.next();
            self.activate(next);
        }
    }

    fn tick_ownership(&mut self, dt: f32) {
        for zone in ZoneId::ALL {
            if self.winner.is_some() {
                return;
            }
            let slot = zone.slot();
            let eligible = {
                let z = &self.zones[slot];
                z.active
                    && z.contested
                    && !z.fully_captured
                    && (z.score_red < self.tuning.capture_threshold
                        || z.score_blue < self.tuning.capture_threshold)
            };
            if !eligible {
                // Stalled: the task keeps its slot but accrues nothing until
                // the rotation makes its zone eligible again.
                continue;
            }
            let Some((pulses, team)) = self.ownership[slot]
                .get_mut()
                .map(|task| (task.ticker.advance(dt), task.team))
            else {
                continue;
            };
            for _ in 0..pulses {
                if self.winner.is_some() || self.zones[slot].fully_captured {
                    break;
                }
                let score = self.zones[slot].add_point(team);
                debug!(zone = %zone, team = %team, score, "ownership tick");
                self.events.push(ZoneEvent::ScoreChanged { team, zone, score });
                self.check_win(zone, team);
            }
        }
    }

    // ---- rotation ---------------------------------------------------------

    /// Deactivate everything and bring up the first capturable zone at or
    /// after `from`, wrapping around the rotation.
    fn activate(&mut self, from: ZoneId) {
        if let Some(task) = self.contest.cancel() {
            self.events.push(ZoneEvent::ContestStopped { zone: task.zone });
        }
        for zone in self.zones.iter_mut() {
            zone.active = false;
        }
        let Some(zone) = self.next_available(from) else {
            // All three zones captured; the win check has already fired.
            debug!("no capturable zone left to activate");
            return;
        };
        self.current = zone;
        self.zones[zone.slot()].active = true;
        info!(zone = %zone, "zone activated");
        self.events.push(ZoneEvent::ZoneActivated { zone });
        // Re-announce both scores so displays switch to the new zone's values.
        let z = &self.zones[zone.slot()];
        self.events.push(ZoneEvent::ScoreChanged {
            team: Team::Red,
            zone,
            score: z.score_red,
        });
        self.events.push(ZoneEvent::ScoreChanged {
            team: Team::Blue,
            zone,
            score: z.score_blue,
        });
        self.countdown.replace(CountdownTask {
            remaining: self.tuning.active_duration,
        });
        self.reseed_ownership(zone);
    }

    fn next_available(&self, from: ZoneId) -> Option<ZoneId> {
        let mut zone = from;
        for _ in 0..ZoneId::ALL.len() {
            if !self.zones[zone.slot()].fully_captured {
                return Some(zone);
            }
            zone = zone.next();
        }
        None
    }

    /// Resume ownership ticks for a revisited contested zone from the
    /// per-team last-claim registers. Red's register takes precedence, and a
    /// register whose player has since left the match is ignored.
    fn reseed_ownership(&mut self, zone: ZoneId) {
        if !self.zones[zone.slot()].contested || self.ownership[zone.slot()].is_live() {
            return;
        }
        let claim = [
            (self.last_claim_red, Team::Red),
            (self.last_claim_blue, Team::Blue),
        ]
        .into_iter()
        .find_map(|(register, team)| match register {
            Some((player_id, z)) if z == zone && self.players.contains_key(&player_id) => {
                Some((player_id, team))
            }
            _ => None,
        });
        if let Some((player_id, team)) = claim {
            debug!(zone = %zone, player_id, team = %team, "resuming ownership ticks");
            self.ownership[zone.slot()].replace(OwnershipTask::new(team));
        }
    }

    // ---- win detection ----------------------------------------------------

    /// Called after `team` scored in `zone`; handles threshold capture and
    /// the two-of-three win.
    fn check_win(&mut self, zone: ZoneId, team: Team) {
        let threshold = self.tuning.capture_threshold;
        {
            let z = &mut self.zones[zone.slot()];
            if z.fully_captured || z.score(team) < threshold {
                return;
            }
            z.fully_captured = true;
        }
        info!(zone = %zone, team = %team, "zone fully captured");
        self.events.push(ZoneEvent::ZoneFullyCaptured { zone, team });
        let captured = ZoneId::ALL
            .iter()
            .filter(|z| self.zones[z.slot()].score(team) >= threshold)
            .count();
        if captured >= ZoneTuning::ZONES_TO_WIN {
            self.declare_winner(team);
            return;
        }
        // A full capture retires the zone on the spot: stop its ownership
        // ticks and move the rotation along without waiting out the countdown.
        self.ownership[zone.slot()].cancel();
        self.countdown.cancel();
        self.activate(zone.next());
    }

    fn declare_winner(&mut self, team: Team) {
        if self.winner.is_some() {
            return;
        }
        self.winner = Some(team);
        self.countdown.cancel();
        if let Some(task) = self.contest.cancel() {
            self.events.push(ZoneEvent::ContestStopped { zone: task.zone });
        }
        for slot in self.ownership.iter_mut() {
            slot.cancel();
        }
        info!(team = %team, "match won");
        self.events.push(ZoneEvent::MatchWon { team });
    }

    fn ensure_authority(&self, operation: &'static str) -> bool {
        if self.role.is_authority() {
            true
        } else {
            warn!(operation, "state mutation ignored on observer peer");
            false
        }
    }

    // ---- read access ------------------------------------------------------

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tuning(&self) -> &ZoneTuning {
        &self.tuning
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    pub fn zone(&self, zone: ZoneId) -> &Zone {
        &self.zones[zone.slot()]
    }

    pub fn active_zone(&self) -> Option<ZoneId> {
        ZoneId::ALL
            .into_iter()
            .find(|zone| self.zones[zone.slot()].active)
    }

    pub fn is_zone_active(&self, zone: ZoneId) -> bool {
        self.zones[zone.slot()].active
    }

    pub fn is_contest_active(&self) -> bool {
        self.contest.is_live()
    }

    pub fn contest_zone(&self) -> Option<ZoneId> {
        self.contest.get().map(|t| t.zone)
    }

    pub fn contest_claimant(&self) -> Option<u64> {
        self.contest.get().map(|t| t.player_id)
    }

    pub fn player_team(&self, player_id: u64) -> Option<Team> {
        self.players.get(&player_id).map(|p| p.team)
    }

    pub fn player_claims(&self, player_id: u64, zone: ZoneId) -> bool {
        self.players
            .get(&player_id)
            .is_some_and(|p| p.claimed_zones.contains(&zone))
    }

    pub fn countdown_remaining(&self) -> f32 {
        self.countdown
            .get()
            .map(|t| t.remaining.max(0.0))
            .unwrap_or(0.0)
    }

    /// Capture-bar value as this peer should draw it, with the role gate
    /// applied ([`Role::renders_fill_for`]).
    pub fn display_fill(&self) -> f32 {
        self.contest
            .get()
            .map(|t| {
                if self.role.renders_fill_for(t.team) {
                    t.fill
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Full point-in-time state for late joiners and lag recovery.
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            zones: ZoneId::ALL.map(|zone| ZoneSnapshot::from((zone, &self.zones[zone.slot()]))),
            active_zone: self.active_zone(),
            countdown_remaining: self.countdown_remaining(),
            contest: self.contest.get().map(|t| ContestSnapshot {
                zone: t.zone,
                player_id: t.player_id,
                team: t.team,
                seconds_left: t.remaining.max(0.0),
                fill: t.fill,
            }),
            winner: self.winner,
        }
    }
}

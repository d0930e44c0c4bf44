// Observer-side read model. Non-authoritative peers never run the zone state
// machine; they fold the broadcast event stream into this projection and
// render its values.

use crate::domain::state::{MatchSnapshot, Role, Team, Zone, ZoneEvent, ZoneId};
use crate::domain::tuning::ZoneTuning;

/// Countdown seconds formatted the way the HUD shows them, floored at zero.
pub fn format_clock(seconds: f32) -> String {
    let total = seconds.max(0.0).floor() as u32;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Contest details as an observer tracks them.
#[derive(Debug, Clone)]
pub struct ContestView {
    pub zone: ZoneId,
    pub player_id: u64,
    pub team: Team,
    /// Frozen at the full window unless the fill gate lets this peer render
    /// the advancing timer.
    pub seconds_left: f32,
}

/// Local copy of match state maintained purely from broadcasts.
///
/// Applies each [`ZoneEvent`] in arrival order; after `MatchWon` the
/// projection freezes and further events are ignored. A late joiner seeds
/// itself from a [`MatchSnapshot`] instead of replaying history.
#[derive(Debug)]
pub struct MatchProjection {
    tuning: ZoneTuning,
    zones: [Zone; 3],
    active_zone: Option<ZoneId>,
    countdown_remaining: f32,
    contest: Option<ContestView>,
    fill_display: f32,
    winner: Option<Team>,
}

impl MatchProjection {
    pub fn new(tuning: ZoneTuning) -> Self {
        Self {
            tuning,
            zones: Default::default(),
            active_zone: None,
            countdown_remaining: 0.0,
            contest: None,
            fill_display: 0.0,
            winner: None,
        }
    }

    /// Replace all local state with a broadcast snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &MatchSnapshot) {
        for view in &snapshot.zones {
            let zone = &mut self.zones[view.zone.slot()];
            zone.active = view.active;
            zone.contested = view.contested;
            zone.fully_captured = view.fully_captured;
            zone.owner_of_last_contest = view.owner;
            zone.score_red = view.score_red;
            zone.score_blue = view.score_blue;
        }
        self.active_zone = snapshot.active_zone;
        self.countdown_remaining = snapshot.countdown_remaining;
        self.winner = snapshot.winner;
        self.contest = snapshot.contest.as_ref().map(|c| ContestView {
            zone: c.zone,
            player_id: c.player_id,
            team: c.team,
            seconds_left: if Role::Observer.renders_fill_for(c.team) {
                c.seconds_left
            } else {
                self.tuning.capture_duration
            },
        });
        self.fill_display = match &snapshot.contest {
            Some(c) if Role::Observer.renders_fill_for(c.team) => c.fill,
            _ => 0.0,
        };
    }

    /// Fold one broadcast event into the projection.
    pub fn apply(&mut self, event: &ZoneEvent) {
        if self.winner.is_some() {
            return;
        }
        match *event {
            ZoneEvent::ZoneActivated { zone } => {
                for z in self.zones.iter_mut() {
                    z.active = false;
                }
                self.zones[zone.slot()].active = true;
                self.active_zone = Some(zone);
                self.countdown_remaining = self.tuning.active_duration;
            }
            ZoneEvent::CountdownTick { seconds_remaining } => {
                self.countdown_remaining = seconds_remaining;
            }
            ZoneEvent::ContestStarted {
                zone,
                player_id,
                team,
            } => {
                self.contest = Some(ContestView {
                    zone,
                    player_id,
                    team,
                    seconds_left: self.tuning.capture_duration,
                });
                self.fill_display = 0.0;
            }
            ZoneEvent::ContestTick {
                team,
                seconds_left,
                fill,
                ..
            } => {
                if Role::Observer.renders_fill_for(team) {
                    self.fill_display = fill;
                    if let Some(contest) = self.contest.as_mut() {
                        contest.seconds_left = seconds_left;
                    }
                }
            }
            ZoneEvent::ContestStopped { .. } => {
                self.contest = None;
                self.fill_display = 0.0;
            }
            ZoneEvent::ContestResolved { zone, team, .. } => {
                let z = &mut self.zones[zone.slot()];
                z.contested = true;
                z.owner_of_last_contest = Some(team);
                self.contest = None;
                self.fill_display = 0.0;
            }
            ZoneEvent::ScoreChanged { team, zone, score } => {
                let z = &mut self.zones[zone.slot()];
                match team {
                    Team::Red => z.score_red = score,
                    Team::Blue => z.score_blue = score,
                }
            }
            ZoneEvent::ZoneFullyCaptured { zone, .. } => {
                self.zones[zone.slot()].fully_captured = true;
            }
            ZoneEvent::MatchWon { team } => {
                self.winner = Some(team);
                self.contest = None;
                self.fill_display = 0.0;
            }
        }
    }

    // ---- rendered values --------------------------------------------------

    pub fn zone(&self, zone: ZoneId) -> &Zone {
        &self.zones[zone.slot()]
    }

    pub fn active_zone(&self) -> Option<ZoneId> {
        self.active_zone
    }

    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    pub fn contest(&self) -> Option<&ContestView> {
        self.contest.as_ref()
    }

    /// Capture-bar value for this peer, already role-gated.
    pub fn fill_display(&self) -> f32 {
        self.fill_display
    }

    /// "MM:SS" countdown, floored at zero.
    pub fn clock(&self) -> String {
        format_clock(self.countdown_remaining)
    }

    pub fn countdown_remaining(&self) -> f32 {
        self.countdown_remaining
    }

    /// "score/threshold" readout for one team in one zone.
    pub fn score_display(&self, zone: ZoneId, team: Team) -> String {
        format!(
            "{}/{}",
            self.zones[zone.slot()].score(team),
            self.tuning.capture_threshold
        )
    }

    /// Completion percentage for one team in one zone.
    pub fn score_percent(&self, zone: ZoneId, team: Team) -> f32 {
        self.zones[zone.slot()].score(team) as f32 / self.tuning.capture_threshold as f32 * 100.0
    }
}

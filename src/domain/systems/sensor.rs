// Per-zone presence sensing. Translates enter/stay/exit transitions into
// start/stop calls on the zone manager; never touches scores or timers
// directly.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::state::{Team, ZoneId};
use crate::domain::systems::zones::ZoneManager;

/// Presence tracker for one zone.
///
/// Keeps the two per-team presence flags plus a local "this sensor started
/// the running contest" marker that deduplicates start calls and scopes
/// both-teams-present stops to the contest's own zone. The occupant map
/// exists so the hosting layer can synthesize a stay evaluation once per tick
/// for everyone still inside.
#[derive(Debug)]
pub struct ZoneSensor {
    zone: ZoneId,
    present_red: bool,
    present_blue: bool,
    started_contest: bool,
    occupants: HashMap<u64, Team>,
}

impl ZoneSensor {
    pub fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            present_red: false,
            present_blue: false,
            started_contest: false,
            occupants: HashMap::new(),
        }
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn contains(&self, player_id: u64) -> bool {
        self.occupants.contains_key(&player_id)
    }

    /// A player crossed into the zone.
    pub fn on_enter(&mut self, manager: &mut ZoneManager, player_id: u64, team: Team) {
        self.occupants.insert(player_id, team);
        match team {
            Team::Red => self.present_red = true,
            Team::Blue => self.present_blue = true,
        }
        debug!(zone = %self.zone, player_id, team = %team, "player entered zone");
        self.evaluate(manager, player_id);
    }

    /// A player is still inside; run once per tick from the hosting loop so a
    /// contest (re)starts as soon as whatever blocked it clears, without
    /// requiring a fresh enter transition.
    pub fn on_stay(&mut self, manager: &mut ZoneManager, player_id: u64) {
        if !self.occupants.contains_key(&player_id) {
            return;
        }
        self.evaluate(manager, player_id);
    }

    /// A player crossed out of the zone.
    pub fn on_exit(&mut self, manager: &mut ZoneManager, player_id: u64, team: Team) {
        self.occupants.remove(&player_id);
        // Presence drops on any exit of that team, teammates notwithstanding;
        // the next stay evaluation re-raises it.
        match team {
            Team::Red => self.present_red = false,
            Team::Blue => self.present_blue = false,
        }
        debug!(zone = %self.zone, player_id, team = %team, "player exited zone");
        if manager.contest_zone() == Some(self.zone)
            && manager.contest_claimant() == Some(player_id)
        {
            self.started_contest = false;
            manager.stop_contest(self.zone);
        }
    }

    /// Shared enter/stay decision: stop our contest when both teams are
    /// present, otherwise try to start one for `player_id`.
    fn evaluate(&mut self, manager: &mut ZoneManager, player_id: u64) {
        if let Some(&team) = self.occupants.get(&player_id) {
            match team {
                Team::Red => self.present_red = true,
                Team::Blue => self.present_blue = true,
            }
        }
        // The contest we started may have resolved or been cancelled since;
        // the marker only means "ours is the one running".
        if self.started_contest && !manager.is_contest_active() {
            self.started_contest = false;
        }
        if self.present_red && self.present_blue {
            if self.started_contest {
                self.started_contest = false;
                manager.stop_contest(self.zone);
            }
            return;
        }
        if self.started_contest {
            return;
        }
        if manager.is_contest_active() {
            return;
        }
        if !manager.is_zone_active(self.zone) {
            return;
        }
        if manager.player_claims(player_id, self.zone) {
            return;
        }
        self.started_contest = true;
        manager.start_contest(player_id, self.zone);
    }
}

/// The match's three sensors, indexed by zone.
#[derive(Debug)]
pub struct ZoneSensors {
    sensors: [ZoneSensor; 3],
}

impl Default for ZoneSensors {
    fn default() -> Self {
        Self {
            sensors: ZoneId::ALL.map(ZoneSensor::new),
        }
    }
}

impl ZoneSensors {
    pub fn get(&self, zone: ZoneId) -> &ZoneSensor {
        &self.sensors[zone.slot()]
    }

    pub fn on_enter(&mut self, manager: &mut ZoneManager, zone: ZoneId, player_id: u64, team: Team) {
        self.sensors[zone.slot()].on_enter(manager, player_id, team);
    }

    pub fn on_exit(&mut self, manager: &mut ZoneManager, zone: ZoneId, player_id: u64, team: Team) {
        self.sensors[zone.slot()].on_exit(manager, player_id, team);
    }

    /// Synthesize one stay evaluation per occupant, lowest player id first so
    /// claimant selection is stable.
    pub fn tick(&mut self, manager: &mut ZoneManager) {
        for sensor in self.sensors.iter_mut() {
            let mut occupants: Vec<u64> = sensor.occupants.keys().copied().collect();
            occupants.sort_unstable();
            for player_id in occupants {
                sensor.on_stay(manager, player_id);
            }
        }
    }

    /// Force-exit a player from every zone they occupy (disconnects).
    pub fn remove_player(&mut self, manager: &mut ZoneManager, player_id: u64) {
        for sensor in self.sensors.iter_mut() {
            if let Some(&team) = sensor.occupants.get(&player_id) {
                sensor.on_exit(manager, player_id, team);
            }
        }
    }
}

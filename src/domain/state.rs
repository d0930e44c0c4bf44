// Domain-level match state: teams, capture zones, the player roster, and the
// events the authoritative zone manager emits for observers.

use std::collections::HashSet;
use std::fmt;

/// The two sides contesting the zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the three capture zones, in rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneId {
    A,
    B,
    C,
}

impl ZoneId {
    pub const ALL: [ZoneId; 3] = [ZoneId::A, ZoneId::B, ZoneId::C];

    /// Stable slot index (0/1/2) used for arrays and wire messages.
    pub fn slot(self) -> usize {
        match self {
            ZoneId::A => 0,
            ZoneId::B => 1,
            ZoneId::C => 2,
        }
    }

    pub fn from_slot(slot: usize) -> ZoneId {
        Self::ALL[slot % Self::ALL.len()]
    }

    /// Next zone in rotation order, wrapping C back to A.
    pub fn next(self) -> ZoneId {
        Self::from_slot(self.slot() + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            ZoneId::A => "A",
            ZoneId::B => "B",
            ZoneId::C => "C",
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether this peer is allowed to mutate shared match state.
///
/// Exactly one peer per match holds `Authority`; everyone else renders
/// broadcast values and never computes state locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authority,
    Observer,
}

impl Role {
    pub fn is_authority(self) -> bool {
        matches!(self, Role::Authority)
    }

    /// Capture-bar display gate, a long-standing visual quirk kept intact:
    /// the authority peer shows advancing fill only for Red claimants, every
    /// other peer only for Blue claimants. Contest resolution and scoring do
    /// not consult this.
    pub fn renders_fill_for(self, claimant: Team) -> bool {
        self.is_authority() == (claimant == Team::Red)
    }
}

/// Per-zone capture bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Zone {
    /// This zone is the rotation's current zone.
    pub active: bool,
    /// At least one contest window has fully resolved here.
    pub contested: bool,
    /// One team's score reached the threshold; the zone is retired from the
    /// rotation for good.
    pub fully_captured: bool,
    /// Team that resolved the most recent contest here.
    pub owner_of_last_contest: Option<Team>,
    pub score_red: u32,
    pub score_blue: u32,
}

impl Zone {
    pub fn score(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.score_red,
            Team::Blue => self.score_blue,
        }
    }

    pub(crate) fn add_point(&mut self, team: Team) -> u32 {
        match team {
            Team::Red => {
                self.score_red += 1;
                self.score_red
            }
            Team::Blue => {
                self.score_blue += 1;
                self.score_blue
            }
        }
    }
}

/// Roster entry for a player known to the match.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub team: Team,
    pub display_name: String,
    /// Zones this player currently holds the exclusive personal claim on.
    /// A resolved contest moves the claim to the winning claimant and strips
    /// it from everyone else.
    pub claimed_zones: HashSet<ZoneId>,
}

impl PlayerState {
    pub fn new(team: Team, display_name: impl Into<String>) -> Self {
        Self {
            team,
            display_name: display_name.into(),
            claimed_zones: HashSet::new(),
        }
    }
}

/// Observable state changes produced by the authoritative manager, in the
/// order the mutations were applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneEvent {
    /// A zone became the rotation's current zone.
    ZoneActivated { zone: ZoneId },
    /// Active-window countdown value for display, floored at zero.
    CountdownTick { seconds_remaining: f32 },
    /// A sole claimant began contesting a zone.
    ContestStarted {
        zone: ZoneId,
        player_id: u64,
        team: Team,
    },
    /// Per-tick contest progress. `fill` advances by the tuned per-second
    /// step, saturating at 1.0; peers gate its display by their network role.
    ContestTick {
        zone: ZoneId,
        team: Team,
        seconds_left: f32,
        fill: f32,
    },
    /// The running contest was cancelled before completing.
    ContestStopped { zone: ZoneId },
    /// A contest window completed; the zone now accrues ownership ticks for
    /// the claimant's team.
    ContestResolved {
        zone: ZoneId,
        player_id: u64,
        team: Team,
    },
    /// A team's score in a zone changed.
    ScoreChanged { team: Team, zone: ZoneId, score: u32 },
    /// A team's score reached the threshold; the zone is permanently theirs.
    ZoneFullyCaptured { zone: ZoneId, team: Team },
    /// A team fully captured two of the three zones. Emitted exactly once.
    MatchWon { team: Team },
}

/// Point-in-time copy of one zone for snapshots.
#[derive(Debug, Clone)]
pub struct ZoneSnapshot {
    pub zone: ZoneId,
    pub active: bool,
    pub contested: bool,
    pub fully_captured: bool,
    pub owner: Option<Team>,
    pub score_red: u32,
    pub score_blue: u32,
}

impl From<(ZoneId, &Zone)> for ZoneSnapshot {
    fn from((zone, z): (ZoneId, &Zone)) -> Self {
        Self {
            zone,
            active: z.active,
            contested: z.contested,
            fully_captured: z.fully_captured,
            owner: z.owner_of_last_contest,
            score_red: z.score_red,
            score_blue: z.score_blue,
        }
    }
}

/// Running contest details included in snapshots.
#[derive(Debug, Clone)]
pub struct ContestSnapshot {
    pub zone: ZoneId,
    pub player_id: u64,
    pub team: Team,
    pub seconds_left: f32,
    pub fill: f32,
}

/// Full match state published every tick so late joiners and lagged
/// observers can resynchronize from a single message.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub zones: [ZoneSnapshot; 3],
    pub active_zone: Option<ZoneId>,
    pub countdown_remaining: f32,
    pub contest: Option<ContestSnapshot>,
    pub winner: Option<Team>,
}

impl MatchSnapshot {
    /// Empty pre-match snapshot (nothing active, nothing scored).
    pub fn empty() -> Self {
        Self {
            zones: ZoneId::ALL.map(|zone| ZoneSnapshot::from((zone, &Zone::default()))),
            active_zone: None,
            countdown_remaining: 0.0,
            contest: None,
            winner: None,
        }
    }
}

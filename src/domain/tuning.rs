// Gameplay tuning for the zone rotation. Values are plain data so tests can
// shrink the windows without touching the systems under test.

/// Knobs governing contests, the rotation countdown, and the win condition.
#[derive(Debug, Clone, Copy)]
pub struct ZoneTuning {
    /// Seconds a sole claimant must hold a zone for the contest to resolve.
    pub capture_duration: f32,
    /// Seconds an active zone stays up before rotating (contest time excluded).
    pub active_duration: f32,
    /// Ownership ticks a team needs to fully capture a zone.
    pub capture_threshold: u32,
    /// Capture-bar fill added per whole contest second.
    pub fill_per_second: f32,
}

impl Default for ZoneTuning {
    fn default() -> Self {
        Self {
            capture_duration: 5.0,
            active_duration: 30.0,
            capture_threshold: 50,
            fill_per_second: 0.2,
        }
    }
}

impl ZoneTuning {
    /// Zones a team must fully capture to win the match.
    pub const ZONES_TO_WIN: usize = 2;
}

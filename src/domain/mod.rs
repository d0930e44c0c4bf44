// Domain layer: core match state and rules.

pub mod projection;
pub mod state;
pub mod systems;
pub mod timer;
pub mod tuning;

pub use projection::MatchProjection;
pub use state::{MatchSnapshot, PlayerState, Role, Team, Zone, ZoneEvent, ZoneId};
pub use systems::{ZoneManager, ZoneSensor, ZoneSensors};
pub use tuning::ZoneTuning;

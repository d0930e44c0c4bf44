// Zone-capture systems advanced by the match tick.

pub mod sensor;
pub mod zones;

pub use sensor::{ZoneSensor, ZoneSensors};
pub use zones::ZoneManager;

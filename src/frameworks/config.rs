use std::{env, time::Duration};

// Server runtime knobs. Gameplay tuning lives in the domain layer.

pub fn http_port() -> u16 {
    env::var("KOTH_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const UPDATE_BROADCAST_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
// How long a finished match lingers before the registry drops it.
pub const MATCH_END_LINGER: Duration = Duration::from_secs(30);

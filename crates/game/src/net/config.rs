use std::time::Duration;

use super::protocol::{
    DEFAULT_INPUT_RATE, DEFAULT_PORT, DEFAULT_SNAPSHOT_RATE, DEFAULT_TICK_RATE, DISCOVERY_PORT,
    MAX_PLAYERS,
};

/// Tunables shared by host and client. The binaries fill this from their
/// command line.
#[derive(Debug, Clone, PartialEq)]
pub struct NetConfig {
    pub port: u16,
    pub discovery_port: u16,
    pub tick_rate: u32,
    pub snapshot_rate: u32,
    pub input_rate: u32,
    pub max_players: usize,
    /// Per-second decay rate used by client smoothing.
    pub smoothing_rate: f32,
    /// Distance in pixels past which the local player's prediction is pulled
    /// toward the host position.
    pub reconcile_threshold: f32,
    /// Client keeps its own movement and only reconciles against the host.
    pub prediction: bool,
    /// Client smooths proxies instead of snapping them to each snapshot.
    pub interpolation: bool,
    pub discovery_interval: Duration,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            discovery_port: DISCOVERY_PORT,
            tick_rate: DEFAULT_TICK_RATE,
            snapshot_rate: DEFAULT_SNAPSHOT_RATE,
            input_rate: DEFAULT_INPUT_RATE,
            max_players: MAX_PLAYERS,
            smoothing_rate: 15.0,
            reconcile_threshold: 48.0,
            prediction: true,
            interpolation: true,
            discovery_interval: Duration::from_secs(1),
        }
    }
}

impl NetConfig {
    pub fn snapshot_interval(&self) -> f32 {
        1.0 / self.snapshot_rate.max(1) as f32
    }

    pub fn input_interval(&self) -> f32 {
        1.0 / self.input_rate.max(1) as f32
    }

    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

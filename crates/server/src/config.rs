use std::time::Duration;

use delve::NetConfig;
use delve::lobby::DEFAULT_MAP_ID;

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub bind: String,
    pub name: String,
    pub net: NetConfig,
    pub map_id: String,
    pub hero_index: u32,
    /// Seats that must be filled, the host's included, before the game starts.
    pub min_players: usize,
    pub discovery: bool,
    /// Stop the gameplay loop after this long. Runs forever when unset.
    pub duration: Option<Duration>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind: String::from("0.0.0.0"),
            name: String::from("Delve host"),
            net: NetConfig::default(),
            map_id: DEFAULT_MAP_ID.to_string(),
            hero_index: 0,
            min_players: 2,
            discovery: true,
            duration: None,
        }
    }
}

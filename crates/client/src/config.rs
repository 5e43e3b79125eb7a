use std::net::SocketAddr;
use std::time::Duration;

use delve::NetConfig;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Join this host directly instead of searching the LAN.
    pub host: Option<SocketAddr>,
    pub name: String,
    pub hero_index: u32,
    pub net: NetConfig,
    pub discovery_timeout: Duration,
    pub join_timeout: Duration,
    /// Resend `HELLO` while no answer has arrived.
    pub hello_retry: Duration,
    pub wander: bool,
    pub duration: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            name: String::from("Adventurer"),
            hero_index: 0,
            net: NetConfig::default(),
            discovery_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(120),
            hello_retry: Duration::from_secs(1),
            wander: false,
            duration: None,
        }
    }
}

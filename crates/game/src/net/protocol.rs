use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::WorldSnapshot;
use crate::world::Intent;

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 5000;
pub const DISCOVERY_PORT: u16 = 5001;
pub const DISCOVERY_MAGIC: &str = "DELVE_DISCOVERY_V1";
pub const DEFAULT_TICK_RATE: u32 = 30;
pub const DEFAULT_SNAPSHOT_RATE: u32 = 20;
pub const DEFAULT_INPUT_RATE: u32 = 20;
pub const MAX_PLAYERS: usize = 5;
pub const MAX_DATAGRAM_SIZE: usize = 65535;

/// Peer id the host uses for its own player.
pub const HOST_PEER_ID: &str = "host";
pub const SOLO_PEER_ID: &str = "solo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Full,
    ProtocolMismatch,
    InProgress,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::Full => "full",
            DenyReason::ProtocolMismatch => "protocol_mismatch",
            DenyReason::InProgress => "in_progress",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of one lobby seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub index: u32,
    pub peer_id: Option<String>,
    pub hero_index: u32,
    pub ready: bool,
    pub name: String,
}

/// Everything a participant needs to leave the lobby and build the dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LobbyData {
    /// peer id -> hero key, e.g. `"peer:1" -> "hero.knight"`.
    pub heroes: BTreeMap<String, String>,
    pub map_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Hello {
        protocol: u32,
        name: String,
    },
    Welcome {
        protocol: u32,
        peer_id: String,
    },
    #[serde(rename = "join_denied")]
    JoinDeny {
        reason: DenyReason,
    },
    LobbyUpdate {
        peer_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hero_index: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ready: Option<bool>,
    },
    LobbyState {
        slots: Vec<SlotInfo>,
    },
    StartGame {
        lobby: LobbyData,
    },
    Input {
        protocol: u32,
        peer_id: String,
        tick: u32,
        intent: Intent,
    },
    Snapshot {
        protocol: u32,
        #[serde(flatten)]
        snapshot: WorldSnapshot,
    },
    Ping {
        time: f64,
    },
    Pong {
        time: f64,
    },
    Disconnect {
        peer_id: String,
    },
}

impl Message {
    pub fn hello(name: impl Into<String>) -> Self {
        Message::Hello {
            protocol: PROTOCOL_VERSION,
            name: name.into(),
        }
    }

    pub fn welcome(peer_id: impl Into<String>) -> Self {
        Message::Welcome {
            protocol: PROTOCOL_VERSION,
            peer_id: peer_id.into(),
        }
    }

    pub fn snapshot(snapshot: WorldSnapshot) -> Self {
        Message::Snapshot {
            protocol: PROTOCOL_VERSION,
            snapshot,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "hello",
            Message::Welcome { .. } => "welcome",
            Message::JoinDeny { .. } => "join_denied",
            Message::LobbyUpdate { .. } => "lobby_update",
            Message::LobbyState { .. } => "lobby_state",
            Message::StartGame { .. } => "start_game",
            Message::Input { .. } => "input",
            Message::Snapshot { .. } => "snapshot",
            Message::Ping { .. } => "ping",
            Message::Pong { .. } => "pong",
            Message::Disconnect { .. } => "disconnect",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::net::codec::{decode, encode};
    use crate::snapshot::{EnemySnapshot, PlayerSnapshot};
    use crate::world::Direction;

    #[test]
    fn messages_are_tagged_by_type() {
        let value = serde_json::to_value(Message::JoinDeny {
            reason: DenyReason::ProtocolMismatch,
        })
        .unwrap();

        assert_eq!(
            value,
            json!({"type": "join_denied", "reason": "protocol_mismatch"})
        );
    }

    #[test]
    fn lobby_update_optional_fields() {
        let decoded: Message =
            decode(br#"{"type":"lobby_update","peer_id":"peer:2","ready":true}"#).unwrap();

        assert_eq!(
            decoded,
            Message::LobbyUpdate {
                peer_id: "peer:2".into(),
                hero_index: None,
                ready: Some(true),
            }
        );

        let value = serde_json::to_value(&decoded).unwrap();
        assert!(value.get("hero_index").is_none());
    }

    #[test]
    fn snapshot_fields_sit_beside_the_tag() {
        let snapshot = WorldSnapshot {
            tick: 42,
            map_id: Some("level1".into()),
            players: vec![PlayerSnapshot {
                peer_id: "host".into(),
                x: 10.0,
                y: 20.5,
                facing: Direction::Left,
                clip: "run".into(),
                frame: 2,
                hp: 4.0,
                map_id: Some("level1".into()),
            }],
            enemies: vec![EnemySnapshot {
                id: 7,
                x: 100.0,
                y: 50.0,
                facing: Direction::Right,
                clip: "idle".into(),
                frame: 0,
                hp: 3.0,
                atlas_id: "enemy.chort".into(),
                map_id: None,
            }],
            pickups: Vec::new(),
        };

        let message = Message::snapshot(snapshot);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["protocol"], PROTOCOL_VERSION);
        assert_eq!(value["tick"], 42);
        assert_eq!(value["enemies"][0]["id"], 7);

        let decoded: Message = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn input_roundtrip() {
        let message = Message::Input {
            protocol: PROTOCOL_VERSION,
            peer_id: "peer:1".into(),
            tick: 9,
            intent: Intent {
                move_x: -1.0,
                move_y: 0.5,
                facing: Direction::Up,
                basic_atk: true,
                basic_atk_held: true,
                dash: false,
                special_atk: false,
            },
        };

        let decoded: Message = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn start_game_roundtrip() {
        let mut heroes = BTreeMap::new();
        heroes.insert("host".to_string(), "hero.knight".to_string());
        heroes.insert("peer:1".to_string(), "hero.wizard".to_string());

        let message = Message::StartGame {
            lobby: LobbyData {
                heroes,
                map_id: "level1".into(),
            },
        };

        let decoded: Message = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
    }
}

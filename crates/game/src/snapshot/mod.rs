//! Full-state world snapshots sent host -> clients.

mod apply;
mod build;

use serde::{Deserialize, Serialize};

use crate::world::Direction;

pub use apply::{ApplyOptions, ApplyReport, HpEvent, SnapshotApplier, apply_world_snapshot};
pub use build::build_world_snapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub peer_id: String,
    pub x: f32,
    pub y: f32,
    pub facing: Direction,
    pub clip: String,
    pub frame: u32,
    pub hp: f32,
    #[serde(default)]
    pub map_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Host-side entity id.
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub facing: Direction,
    pub clip: String,
    pub frame: u32,
    pub hp: f32,
    pub atlas_id: String,
    #[serde(default)]
    pub map_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub kind: String,
    pub atlas_id: String,
    #[serde(default)]
    pub map_id: Option<String>,
}

/// Authoritative state of everything clients render, at one host tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u32,
    #[serde(default)]
    pub map_id: Option<String>,
    #[serde(default)]
    pub players: Vec<PlayerSnapshot>,
    #[serde(default)]
    pub enemies: Vec<EnemySnapshot>,
    #[serde(default)]
    pub pickups: Vec<PickupSnapshot>,
}

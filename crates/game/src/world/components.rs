use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerTag;

/// Marks the one player entity driven by this process's input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalControlled;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub peer_id: String,
}

impl Owner {
    pub fn new(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
        }
    }
}

/// World-space position plus the latest network-reported target.
///
/// `synced` is false for a proxy that has not been placed yet; the
/// smoothing system snaps such transforms onto their first target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub net_target: Option<Vec2>,
    pub synced: bool,
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            net_target: None,
            synced: true,
        }
    }

    pub fn proxy() -> Self {
        Self {
            position: Vec2::ZERO,
            net_target: None,
            synced: false,
        }
    }

    /// Places the transform on `position` immediately, skipping smoothing.
    pub fn snap_to(&mut self, position: Vec2) {
        self.position = position;
        self.net_target = Some(position);
        self.synced = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    pub move_x: f32,
    pub move_y: f32,
    pub facing: Direction,
    pub basic_atk: bool,
    pub basic_atk_held: bool,
    pub dash: bool,
    pub special_atk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facing {
    pub direction: Direction,
}

impl Default for Facing {
    fn default() -> Self {
        Self {
            direction: Direction::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub clip: String,
    pub frame: u32,
    pub time: f32,
    pub changed: bool,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            clip: String::from("idle"),
            frame: 0,
            time: 0.0,
            changed: true,
        }
    }
}

impl AnimationState {
    /// Switches to `clip`, restarting it only when it differs from the current one.
    pub fn play(&mut self, clip: &str) {
        if self.clip != clip {
            self.clip = clip.to_string();
            self.frame = 0;
            self.time = 0.0;
            self.changed = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Life {
    pub hp: f32,
}

impl Default for Life {
    fn default() -> Self {
        Self { hp: 5.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ai {
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub atlas_id: String,
}

impl Sprite {
    pub fn new(atlas_id: impl Into<String>) -> Self {
        Self {
            atlas_id: atlas_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pickup {
    pub kind: String,
}

impl Default for Pickup {
    fn default() -> Self {
        Self {
            kind: String::from("potion_health"),
        }
    }
}

/// Map an entity currently lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnMap {
    pub id: String,
}

impl OnMap {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Singleton naming the map the host is simulating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMap {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteCategory {
    Enemy,
    Pickup,
}

impl RemoteCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteCategory::Enemy => "enemy",
            RemoteCategory::Pickup => "pickup",
        }
    }
}

/// Client-side proxy for an entity owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteEntity {
    pub remote_id: u32,
    pub category: RemoteCategory,
}

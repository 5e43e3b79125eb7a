use glam::Vec2;

use crate::world::{ComponentKind, System, Transform, World};

pub const DEFAULT_SMOOTHING_RATE: f32 = 15.0;

/// One step of exponential decay from `current` toward `target`.
pub fn smooth_toward(current: Vec2, target: Vec2, rate: f32, dt: f32) -> Vec2 {
    let alpha = (rate * dt).clamp(0.0, 1.0);
    current + (target - current) * alpha
}

/// Eases rendered positions toward their network target on the client.
/// Transforms that were never placed jump straight to their first target.
#[derive(Debug, Clone)]
pub struct SmoothingSystem {
    rate: f32,
}

impl SmoothingSystem {
    pub fn new(rate: f32) -> Self {
        Self { rate }
    }

    /// Places every transform straight on its target.
    pub fn snapping() -> Self {
        Self::new(f32::MAX)
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }
}

impl Default for SmoothingSystem {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_RATE)
    }
}

impl System for SmoothingSystem {
    fn name(&self) -> &str {
        "smoothing"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        for (_, set) in world.query_mut(ComponentKind::TRANSFORM) {
            let Some(transform) = set.get_mut::<Transform>() else {
                continue;
            };
            let Some(target) = transform.net_target else {
                continue;
            };

            if transform.synced {
                transform.position = smooth_toward(transform.position, target, self.rate, dt);
            } else {
                transform.snap_to(target);
            }
        }
    }
}

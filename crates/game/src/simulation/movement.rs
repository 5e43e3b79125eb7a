use glam::Vec2;

use crate::world::{AnimationState, ComponentKind, Direction, Facing, Intent, Transform, World};

/// Walking speed in pixels per second.
pub const WALK_SPEED: f32 = 96.0;
pub const DASH_MULTIPLIER: f32 = 2.5;

fn velocity(intent: &Intent) -> Vec2 {
    let direction = Vec2::new(intent.move_x, intent.move_y).clamp_length_max(1.0);
    let speed = if intent.dash {
        WALK_SPEED * DASH_MULTIPLIER
    } else {
        WALK_SPEED
    };
    direction * speed
}

/// Moves every player by its latest intent.
///
/// The host runs this as the authority. A predicting client runs the same
/// rule on its local player so it moves before the host confirms it.
pub fn movement_system(world: &mut World, dt: f32) {
    let kinds = ComponentKind::PLAYER | ComponentKind::TRANSFORM | ComponentKind::INTENT;

    for (_, set) in world.query_mut(kinds) {
        let Some(intent) = set.get::<Intent>().copied() else {
            continue;
        };
        let velocity = velocity(&intent);
        let moving = velocity != Vec2::ZERO;

        if let Some(transform) = set.get_mut::<Transform>() {
            transform.position += velocity * dt;
        }

        if moving && let Some(facing) = set.get_mut::<Facing>() {
            facing.direction = if intent.move_x < 0.0 {
                Direction::Left
            } else if intent.move_x > 0.0 {
                Direction::Right
            } else {
                intent.facing
            };
        }

        if let Some(anim) = set.get_mut::<AnimationState>() {
            anim.play(if moving { "run" } else { "idle" });
            anim.time += dt;
        }
    }
}

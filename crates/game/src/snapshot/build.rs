use crate::world::{
    ActiveMap, AnimationState, ComponentKind, ComponentSet, Facing, Life, OnMap, Owner, Pickup,
    Sprite, Transform, World,
};

use super::{EnemySnapshot, PickupSnapshot, PlayerSnapshot, WorldSnapshot};

const PLAYER_KINDS: ComponentKind = ComponentKind::PLAYER
    .union(ComponentKind::OWNER)
    .union(ComponentKind::TRANSFORM)
    .union(ComponentKind::FACING)
    .union(ComponentKind::ANIMATION)
    .union(ComponentKind::LIFE);

const ENEMY_KINDS: ComponentKind = ComponentKind::AI
    .union(ComponentKind::LIFE)
    .union(ComponentKind::TRANSFORM)
    .union(ComponentKind::FACING)
    .union(ComponentKind::ANIMATION)
    .union(ComponentKind::SPRITE);

const PICKUP_KINDS: ComponentKind = ComponentKind::PICKUP
    .union(ComponentKind::TRANSFORM)
    .union(ComponentKind::SPRITE);

fn map_of(set: &ComponentSet) -> Option<String> {
    set.get::<OnMap>().map(|m| m.id.clone())
}

/// Reads every player, enemy and pickup into one snapshot. Enemies are AI
/// entities that are not players; their wire id is the host entity id.
pub fn build_world_snapshot(world: &World, tick: u32) -> WorldSnapshot {
    let map_id = world
        .query(ComponentKind::ACTIVE_MAP)
        .find_map(|(_, set)| set.get::<ActiveMap>().map(|m| m.id.clone()));

    let players = world
        .query(PLAYER_KINDS)
        .filter_map(|(_, set)| {
            let transform = set.get::<Transform>()?;
            let anim = set.get::<AnimationState>()?;
            Some(PlayerSnapshot {
                peer_id: set.get::<Owner>()?.peer_id.clone(),
                x: transform.position.x,
                y: transform.position.y,
                facing: set.get::<Facing>()?.direction,
                clip: anim.clip.clone(),
                frame: anim.frame,
                hp: set.get::<Life>()?.hp,
                map_id: map_of(set),
            })
        })
        .collect();

    let enemies = world
        .query(ENEMY_KINDS)
        .filter(|(_, set)| !set.contains(ComponentKind::PLAYER))
        .filter_map(|(id, set)| {
            let transform = set.get::<Transform>()?;
            let anim = set.get::<AnimationState>()?;
            Some(EnemySnapshot {
                id: id.raw(),
                x: transform.position.x,
                y: transform.position.y,
                facing: set.get::<Facing>()?.direction,
                clip: anim.clip.clone(),
                frame: anim.frame,
                hp: set.get::<Life>()?.hp,
                atlas_id: set.get::<Sprite>()?.atlas_id.clone(),
                map_id: map_of(set),
            })
        })
        .collect();

    let pickups = world
        .query(PICKUP_KINDS)
        .filter_map(|(id, set)| {
            let transform = set.get::<Transform>()?;
            Some(PickupSnapshot {
                id: id.raw(),
                x: transform.position.x,
                y: transform.position.y,
                kind: set.get::<Pickup>()?.kind.clone(),
                atlas_id: set.get::<Sprite>()?.atlas_id.clone(),
                map_id: map_of(set),
            })
        })
        .collect();

    WorldSnapshot {
        tick,
        map_id,
        players,
        enemies,
        pickups,
    }
}

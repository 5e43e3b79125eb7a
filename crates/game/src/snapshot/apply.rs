use std::collections::HashSet;

use glam::Vec2;

use crate::world::{
    AnimationState, ComponentKind, ComponentSet, EntityId, Facing, Life, LocalControlled, OnMap,
    Owner, Pickup, PlayerTag, RemoteCategory, RemoteEntity, Sprite, Transform, World,
};

use super::{EnemySnapshot, PickupSnapshot, PlayerSnapshot, WorldSnapshot};

/// Distance under which a local correction counts as finished.
const SETTLE_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplyOptions {
    /// How far the local prediction may drift from the host before it is
    /// pulled back.
    pub reconcile_threshold: f32,
    /// When off, the local player follows the host like any remote player.
    pub prediction: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            reconcile_threshold: 48.0,
            prediction: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpEvent {
    Hit,
    Death,
}

impl HpEvent {
    fn between(old_hp: f32, new_hp: f32) -> Option<Self> {
        if old_hp > 0.0 && new_hp <= 0.0 {
            Some(HpEvent::Death)
        } else if new_hp < old_hp {
            Some(HpEvent::Hit)
        } else {
            None
        }
    }
}

/// What changed while applying one snapshot, for audio/scene code to react to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub local_hp: Option<HpEvent>,
    /// `(remote_id, event)` for enemies whose hp dropped.
    pub enemy_hp: Vec<(u32, HpEvent)>,
    /// New map of the local player when the snapshot moved it.
    pub map_changed: Option<String>,
    pub spawned: Vec<EntityId>,
    pub retired: Vec<EntityId>,
}

/// Overwrites client proxies with one authoritative snapshot.
///
/// No tick check happens here; [`SnapshotApplier`] is the gate that drops
/// stale and duplicate snapshots.
pub fn apply_world_snapshot(
    world: &mut World,
    snapshot: &WorldSnapshot,
    local_peer_id: &str,
    options: ApplyOptions,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for player in &snapshot.players {
        apply_player(world, player, local_peer_id, options, &mut report);
    }
    let live: HashSet<&str> = snapshot.players.iter().map(|p| p.peer_id.as_str()).collect();
    retire_departed_players(world, &live, &mut report);

    for enemy in &snapshot.enemies {
        apply_enemy(world, enemy, &mut report);
    }
    let live: HashSet<u32> = snapshot.enemies.iter().map(|e| e.id).collect();
    retire_missing(world, RemoteCategory::Enemy, &live, &mut report);

    for pickup in &snapshot.pickups {
        apply_pickup(world, pickup, &mut report);
    }
    let live: HashSet<u32> = snapshot.pickups.iter().map(|p| p.id).collect();
    retire_missing(world, RemoteCategory::Pickup, &live, &mut report);

    report
}

fn sync_map(set: &mut ComponentSet, map_id: Option<&str>) -> bool {
    let Some(map_id) = map_id else {
        return false;
    };

    let changed = set.get::<OnMap>().is_none_or(|m| m.id != map_id);
    if changed {
        set.insert(OnMap::new(map_id));
    }
    changed
}

fn apply_player(
    world: &mut World,
    player: &PlayerSnapshot,
    local_peer_id: &str,
    options: ApplyOptions,
    report: &mut ApplyReport,
) {
    let is_local = player.peer_id == local_peer_id;

    let existing = world.find(ComponentKind::PLAYER | ComponentKind::OWNER, |set| {
        set.get::<Owner>()
            .is_some_and(|owner| owner.peer_id == player.peer_id)
    });

    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => {
            let mut set = ComponentSet::new()
                .with(PlayerTag)
                .with(Owner::new(player.peer_id.clone()))
                .with(Transform::proxy())
                .with(Facing::default())
                .with(AnimationState::default())
                .with(Life { hp: player.hp });
            if is_local {
                set.insert(LocalControlled);
            }
            let id = world.spawn(set);
            report.spawned.push(id);
            (id, true)
        }
    };

    let Some(set) = world.components_of(id) else {
        return;
    };

    let map_changed = sync_map(set, player.map_id.as_deref());
    let target = Vec2::new(player.x, player.y);

    let transform = set.get_or_insert_with(Transform::proxy);
    if is_local && (map_changed || !transform.synced) {
        transform.snap_to(target);
    } else if !is_local || !options.prediction {
        transform.net_target = Some(target);
    } else {
        let error = transform.position.distance(target);
        // A correction in progress runs until the prediction has settled.
        let correcting = transform.net_target.is_some() && error > SETTLE_DISTANCE;
        transform.net_target =
            (error > options.reconcile_threshold || correcting).then_some(target);
    }

    if is_local && map_changed {
        report.map_changed = player.map_id.clone();
    }

    let life = set.get_or_insert_with(Life::default);
    let old_hp = life.hp;
    life.hp = player.hp;
    if is_local && !fresh {
        report.local_hp = HpEvent::between(old_hp, player.hp);
    }

    set.get_or_insert_with(Facing::default).direction = player.facing;
    set.get_or_insert_with(AnimationState::default)
        .play(&player.clip);
}

fn find_or_spawn_remote(
    world: &mut World,
    remote: RemoteEntity,
    make: impl FnOnce() -> ComponentSet,
    report: &mut ApplyReport,
) -> (EntityId, bool) {
    if let Some(id) = world.find(ComponentKind::REMOTE, |set| {
        set.get::<RemoteEntity>() == Some(&remote)
    }) {
        return (id, false);
    }

    let id = world.spawn(make().with(remote));
    report.spawned.push(id);
    (id, true)
}

fn apply_enemy(world: &mut World, enemy: &EnemySnapshot, report: &mut ApplyReport) {
    let remote = RemoteEntity {
        remote_id: enemy.id,
        category: RemoteCategory::Enemy,
    };
    let (id, fresh) = find_or_spawn_remote(
        world,
        remote,
        || {
            ComponentSet::new()
                .with(Transform::proxy())
                .with(Facing::default())
                .with(AnimationState::default())
                .with(Sprite::new(enemy.atlas_id.clone()))
                .with(Life { hp: enemy.hp })
        },
        report,
    );

    let Some(set) = world.components_of(id) else {
        return;
    };

    set.get_or_insert_with(Transform::proxy).net_target = Some(Vec2::new(enemy.x, enemy.y));
    set.get_or_insert_with(Facing::default).direction = enemy.facing;

    let anim = set.get_or_insert_with(AnimationState::default);
    anim.clip.clone_from(&enemy.clip);
    anim.frame = enemy.frame;
    anim.changed = true;

    let life = set.get_or_insert_with(Life::default);
    let old_hp = life.hp;
    life.hp = enemy.hp;
    if !fresh && let Some(event) = HpEvent::between(old_hp, enemy.hp) {
        report.enemy_hp.push((enemy.id, event));
    }

    let sprite = set.get_or_insert_with(|| Sprite::new(enemy.atlas_id.clone()));
    if sprite.atlas_id != enemy.atlas_id {
        sprite.atlas_id.clone_from(&enemy.atlas_id);
    }

    sync_map(set, enemy.map_id.as_deref());
}

fn apply_pickup(world: &mut World, pickup: &PickupSnapshot, report: &mut ApplyReport) {
    let remote = RemoteEntity {
        remote_id: pickup.id,
        category: RemoteCategory::Pickup,
    };
    let (id, _) = find_or_spawn_remote(
        world,
        remote,
        || {
            ComponentSet::new()
                .with(Transform::proxy())
                .with(Sprite::new(pickup.atlas_id.clone()))
                .with(Pickup {
                    kind: pickup.kind.clone(),
                })
        },
        report,
    );

    let Some(set) = world.components_of(id) else {
        return;
    };

    set.get_or_insert_with(Transform::proxy).net_target = Some(Vec2::new(pickup.x, pickup.y));
    set.get_or_insert_with(Pickup::default)
        .kind
        .clone_from(&pickup.kind);
    sync_map(set, pickup.map_id.as_deref());
}

fn retire_missing(
    world: &mut World,
    category: RemoteCategory,
    live: &HashSet<u32>,
    report: &mut ApplyReport,
) {
    let stale: Vec<EntityId> = world
        .query(ComponentKind::REMOTE)
        .filter(|(_, set)| {
            set.get::<RemoteEntity>()
                .is_some_and(|r| r.category == category && !live.contains(&r.remote_id))
        })
        .map(|(id, _)| id)
        .collect();

    for id in stale {
        world.delete_entity(id);
        report.retired.push(id);
    }
}

/// Removes proxies of peers the host no longer simulates. The local player
/// is never retired here.
fn retire_departed_players(world: &mut World, live: &HashSet<&str>, report: &mut ApplyReport) {
    let departed: Vec<EntityId> = world
        .query(ComponentKind::PLAYER | ComponentKind::OWNER)
        .filter(|(_, set)| {
            !set.has::<LocalControlled>()
                && set
                    .get::<Owner>()
                    .is_some_and(|owner| !live.contains(owner.peer_id.as_str()))
        })
        .map(|(id, _)| id)
        .collect();

    for id in departed {
        world.delete_entity(id);
        report.retired.push(id);
    }
}

/// Applies snapshots in strictly increasing tick order; anything at or
/// below the last applied tick is dropped.
#[derive(Debug, Clone)]
pub struct SnapshotApplier {
    local_peer_id: String,
    last_tick: Option<u32>,
    options: ApplyOptions,
}

impl SnapshotApplier {
    pub fn new(local_peer_id: impl Into<String>, options: ApplyOptions) -> Self {
        Self {
            local_peer_id: local_peer_id.into(),
            last_tick: None,
            options,
        }
    }

    pub fn local_peer_id(&self) -> &str {
        &self.local_peer_id
    }

    pub fn last_tick(&self) -> Option<u32> {
        self.last_tick
    }

    pub fn accepts(&self, tick: u32) -> bool {
        self.last_tick.is_none_or(|last| tick > last)
    }

    pub fn apply(&mut self, world: &mut World, snapshot: &WorldSnapshot) -> Option<ApplyReport> {
        if !self.accepts(snapshot.tick) {
            log::trace!(
                "dropping stale snapshot {} (last {:?})",
                snapshot.tick,
                self.last_tick
            );
            return None;
        }

        self.last_tick = Some(snapshot.tick);
        Some(apply_world_snapshot(
            world,
            snapshot,
            &self.local_peer_id,
            self.options,
        ))
    }
}

mod component;
mod components;

use std::collections::BTreeMap;
use std::fmt;

pub use component::{Component, ComponentKind, ComponentSet};
pub use components::{
    ActiveMap, Ai, AnimationState, Direction, Facing, Intent, Life, LocalControlled, OnMap, Owner,
    Pickup, PlayerTag, RemoteCategory, RemoteEntity, Sprite, Transform,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something the world runs once per tick.
pub trait System {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn update(&mut self, world: &mut World, dt: f32);
}

impl<F> System for F
where
    F: FnMut(&mut World, f32),
{
    fn update(&mut self, world: &mut World, dt: f32) {
        self(world, dt)
    }
}

pub struct World {
    entities: BTreeMap<EntityId, ComponentSet>,
    systems: Vec<Box<dyn System>>,
    next_id: u32,
    pending_delete: Vec<EntityId>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field(
                "systems",
                &self.systems.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("pending_delete", &self.pending_delete)
            .finish()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            systems: Vec::new(),
            next_id: 1,
            pending_delete: Vec::new(),
        }
    }

    pub fn new_entity(&mut self) -> EntityId {
        self.spawn(ComponentSet::new())
    }

    pub fn spawn(&mut self, components: ComponentSet) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, components);
        id
    }

    /// Attaches `component` to `id`. Returns false if the entity does not exist.
    pub fn add<T: Component>(&mut self, id: EntityId, component: T) -> bool {
        match self.entities.get_mut(&id) {
            Some(set) => {
                set.insert(component);
                true
            }
            None => {
                log::trace!("add to missing entity {}", id);
                false
            }
        }
    }

    pub fn get<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id).and_then(ComponentSet::get::<T>)
    }

    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id).and_then(ComponentSet::get_mut::<T>)
    }

    pub fn remove<T: Component>(&mut self, id: EntityId) -> Option<T> {
        self.entities.get_mut(&id).and_then(ComponentSet::remove::<T>)
    }

    pub fn components_of(&mut self, id: EntityId) -> Option<&mut ComponentSet> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Entities holding every kind in `kinds`, in ascending id order.
    pub fn query(&self, kinds: ComponentKind) -> impl Iterator<Item = (EntityId, &ComponentSet)> {
        self.entities
            .iter()
            .filter(move |(_, set)| set.contains(kinds))
            .map(|(&id, set)| (id, set))
    }

    pub fn query_mut(
        &mut self,
        kinds: ComponentKind,
    ) -> impl Iterator<Item = (EntityId, &mut ComponentSet)> {
        self.entities
            .iter_mut()
            .filter(move |(_, set)| set.contains(kinds))
            .map(|(&id, set)| (id, set))
    }

    /// Collects matching ids up front so the caller can mutate the world
    /// structurally while walking them.
    pub fn query_ids(&self, kinds: ComponentKind) -> Vec<EntityId> {
        self.query(kinds).map(|(id, _)| id).collect()
    }

    pub fn find(
        &self,
        kinds: ComponentKind,
        mut predicate: impl FnMut(&ComponentSet) -> bool,
    ) -> Option<EntityId> {
        self.query(kinds)
            .find(|(_, set)| predicate(set))
            .map(|(id, _)| id)
    }

    pub fn delete_entity(&mut self, id: EntityId) -> Option<ComponentSet> {
        self.entities.remove(&id)
    }

    /// Deletes `id` once the current [`World::update`] has run every system.
    pub fn queue_delete(&mut self, id: EntityId) {
        if !self.pending_delete.contains(&id) {
            self.pending_delete.push(id);
        }
    }

    pub fn cleanup_deleted(&mut self) {
        for id in self.pending_delete.drain(..) {
            self.entities.remove(&id);
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn add_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn update(&mut self, dt: f32) {
        let mut systems = std::mem::take(&mut self.systems);
        for system in &mut systems {
            system.update(self, dt);
        }
        // Systems registered mid-tick run from the next tick on.
        systems.append(&mut self.systems);
        self.systems = systems;

        self.cleanup_deleted();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;

    #[test]
    fn query_requires_every_kind() {
        let mut world = World::new();
        let a = world.spawn(ComponentSet::new().with(PlayerTag).with(Life::default()));
        let _b = world.spawn(ComponentSet::new().with(Life::default()));

        let ids = world.query_ids(ComponentKind::PLAYER | ComponentKind::LIFE);
        assert_eq!(ids, vec![a]);
        assert_eq!(world.query(ComponentKind::LIFE).count(), 2);
    }

    #[test]
    fn deleted_entity_never_reappears() {
        let mut world = World::new();
        let a = world.new_entity();
        world.add(a, Life::default());
        world.delete_entity(a);

        assert!(!world.add(a, Life::default()));
        assert!(world.components_of(a).is_none());
        assert_eq!(world.query(ComponentKind::LIFE).count(), 0);

        let b = world.new_entity();
        assert_ne!(a, b);
    }

    #[test]
    fn systems_run_in_registration_order() {
        let mut world = World::new();
        let log = world.spawn(ComponentSet::new().with(Ai { kind: String::new() }));

        world.add_system(move |world: &mut World, _dt: f32| {
            if let Some(ai) = world.get_mut::<Ai>(log) {
                ai.kind.push('a');
            }
        });
        world.add_system(move |world: &mut World, _dt: f32| {
            if let Some(ai) = world.get_mut::<Ai>(log) {
                ai.kind.push('b');
            }
        });

        world.update(0.1);
        world.update(0.1);

        assert_eq!(world.get::<Ai>(log).map(|a| a.kind.as_str()), Some("abab"));
    }

    #[test]
    fn deferred_delete_runs_after_all_systems() {
        let mut world = World::new();
        let doomed = world.spawn(ComponentSet::new().with(Life { hp: 0.0 }));
        let seen_by_second = world.spawn(ComponentSet::new().with(Ai { kind: String::new() }));

        world.add_system(|world: &mut World, _dt: f32| {
            for id in world.query_ids(ComponentKind::LIFE) {
                if world.get::<Life>(id).is_some_and(|l| l.hp <= 0.0) {
                    world.queue_delete(id);
                }
            }
        });
        world.add_system(move |world: &mut World, _dt: f32| {
            let alive = world.query(ComponentKind::LIFE).count();
            if let Some(ai) = world.get_mut::<Ai>(seen_by_second) {
                ai.kind = alive.to_string();
            }
        });

        world.update(0.016);

        assert!(!world.contains(doomed));
        assert_eq!(
            world.get::<Ai>(seen_by_second).map(|a| a.kind.as_str()),
            Some("1")
        );
    }

    #[test]
    fn structural_mutation_while_walking_query() {
        let mut world = World::new();
        for i in 0..8 {
            world.spawn(
                ComponentSet::new()
                    .with(Transform::at(Vec2::new(i as f32, 0.0)))
                    .with(Life::default()),
            );
        }

        for id in world.query_ids(ComponentKind::TRANSFORM) {
            if id.raw() % 2 == 0 {
                world.delete_entity(id);
            } else {
                world.remove::<Life>(id);
                world.new_entity();
            }
        }

        assert_eq!(world.query(ComponentKind::TRANSFORM).count(), 4);
        assert!(world.query(ComponentKind::LIFE).next().is_none());
        assert!(
            world
                .query(ComponentKind::TRANSFORM)
                .all(|(_, set)| set.has::<Transform>())
        );
    }

    #[test]
    fn random_add_delete_sequences_keep_query_consistent() {
        let mut world = World::new();
        let mut live: Vec<EntityId> = Vec::new();
        let mut deleted: Vec<EntityId> = Vec::new();
        let mut seed: u32 = 0x2545_F491;

        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;

            match seed % 4 {
                0 | 1 => live.push(world.spawn(ComponentSet::new().with(PlayerTag))),
                2 if !live.is_empty() => {
                    let id = live.swap_remove(seed as usize % live.len());
                    world.remove::<PlayerTag>(id);
                    world.add(id, Life::default());
                    deleted.push(id);
                    world.delete_entity(id);
                }
                _ => {
                    if let Some(&id) = live.first() {
                        world.add(id, Life::default());
                    }
                }
            }

            for (id, set) in world.query(ComponentKind::PLAYER) {
                assert!(set.has::<PlayerTag>());
                assert!(!deleted.contains(&id));
            }
        }
    }
}

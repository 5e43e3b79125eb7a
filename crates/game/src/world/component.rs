use bitflags::bitflags;

use super::components::{
    ActiveMap, Ai, AnimationState, Facing, Intent, Life, LocalControlled, OnMap, Owner, Pickup,
    PlayerTag, RemoteEntity, Sprite, Transform,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentKind: u32 {
        const PLAYER = 1 << 0;
        const LOCAL = 1 << 1;
        const OWNER = 1 << 2;
        const TRANSFORM = 1 << 3;
        const INTENT = 1 << 4;
        const FACING = 1 << 5;
        const ANIMATION = 1 << 6;
        const LIFE = 1 << 7;
        const AI = 1 << 8;
        const SPRITE = 1 << 9;
        const PICKUP = 1 << 10;
        const ON_MAP = 1 << 11;
        const ACTIVE_MAP = 1 << 12;
        const REMOTE = 1 << 13;
    }
}

/// A component type with a fixed slot in [`ComponentSet`].
pub trait Component: Sized + 'static {
    const KIND: ComponentKind;

    fn slot(set: &ComponentSet) -> &Option<Self>;
    fn slot_mut(set: &mut ComponentSet) -> &mut Option<Self>;
}

macro_rules! component_set {
    ($($field:ident: $ty:ty => $kind:ident),* $(,)?) => {
        /// All components attached to one entity, at most one per kind.
        #[derive(Debug, Clone, Default)]
        pub struct ComponentSet {
            mask: ComponentKind,
            $($field: Option<$ty>,)*
        }

        $(
            impl Component for $ty {
                const KIND: ComponentKind = ComponentKind::$kind;

                fn slot(set: &ComponentSet) -> &Option<Self> {
                    &set.$field
                }

                fn slot_mut(set: &mut ComponentSet) -> &mut Option<Self> {
                    &mut set.$field
                }
            }
        )*
    };
}

component_set! {
    player: PlayerTag => PLAYER,
    local: LocalControlled => LOCAL,
    owner: Owner => OWNER,
    transform: Transform => TRANSFORM,
    intent: Intent => INTENT,
    facing: Facing => FACING,
    animation: AnimationState => ANIMATION,
    life: Life => LIFE,
    ai: Ai => AI,
    sprite: Sprite => SPRITE,
    pickup: Pickup => PICKUP,
    on_map: OnMap => ON_MAP,
    active_map: ActiveMap => ACTIVE_MAP,
    remote: RemoteEntity => REMOTE,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.insert(component);
        self
    }

    pub fn kinds(&self) -> ComponentKind {
        self.mask
    }

    pub fn contains(&self, kinds: ComponentKind) -> bool {
        self.mask.contains(kinds)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.mask.contains(T::KIND)
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        T::slot(self).as_ref()
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        T::slot_mut(self).as_mut()
    }

    /// Inserts `component`, returning the instance it replaced.
    pub fn insert<T: Component>(&mut self, component: T) -> Option<T> {
        self.mask.insert(T::KIND);
        T::slot_mut(self).replace(component)
    }

    pub fn remove<T: Component>(&mut self) -> Option<T> {
        self.mask.remove(T::KIND);
        T::slot_mut(self).take()
    }

    pub fn get_or_insert_with<T: Component>(&mut self, make: impl FnOnce() -> T) -> &mut T {
        self.mask.insert(T::KIND);
        T::slot_mut(self).get_or_insert_with(make)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_tracks_insert_and_remove() {
        let mut set = ComponentSet::new().with(PlayerTag).with(Life { hp: 3.0 });

        assert!(set.contains(ComponentKind::PLAYER | ComponentKind::LIFE));
        assert!(!set.has::<Transform>());

        let old = set.insert(Life { hp: 1.0 });
        assert_eq!(old.map(|l| l.hp), Some(3.0));
        assert_eq!(set.get::<Life>().map(|l| l.hp), Some(1.0));

        set.remove::<PlayerTag>();
        assert_eq!(set.kinds(), ComponentKind::LIFE);
    }

    #[test]
    fn get_or_insert_sets_kind() {
        let mut set = ComponentSet::new();
        set.get_or_insert_with(|| OnMap::new("level1")).id = "level2".into();

        assert!(set.has::<OnMap>());
        assert_eq!(set.get::<OnMap>().map(|m| m.id.as_str()), Some("level2"));
    }
}

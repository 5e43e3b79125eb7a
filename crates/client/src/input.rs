use delve::world::{Direction, Intent};
use delve::{ComponentKind, System, World};

/// Seconds spent walking each leg of the wander square.
const LEG_SECONDS: f32 = 1.5;

const LEGS: [(f32, f32, Direction); 4] = [
    (1.0, 0.0, Direction::Right),
    (0.0, 1.0, Direction::Down),
    (-1.0, 0.0, Direction::Left),
    (0.0, -1.0, Direction::Up),
];

/// Scripted input for a headless client: walks a square forever.
#[derive(Debug, Default)]
pub struct Wander {
    elapsed: f32,
}

impl Wander {
    pub fn intent_at(elapsed: f32) -> Intent {
        let leg = (elapsed / LEG_SECONDS) as usize % LEGS.len();
        let (move_x, move_y, facing) = LEGS[leg];
        Intent {
            move_x,
            move_y,
            facing,
            ..Intent::default()
        }
    }
}

impl System for Wander {
    fn update(&mut self, world: &mut World, dt: f32) {
        self.elapsed += dt;
        let intent = Self::intent_at(self.elapsed);

        for (_, set) in world.query_mut(ComponentKind::LOCAL | ComponentKind::INTENT) {
            set.insert(intent);
        }
    }
}

#[cfg(test)]
mod tests {
    use delve::ComponentSet;
    use delve::world::{LocalControlled, PlayerTag};

    use super::*;

    #[test]
    fn test_wander_cycles_legs() {
        assert_eq!(Wander::intent_at(0.0).move_x, 1.0);
        assert_eq!(Wander::intent_at(2.0).move_y, 1.0);
        assert_eq!(Wander::intent_at(3.5).facing, Direction::Left);
        assert_eq!(Wander::intent_at(5.0).move_y, -1.0);
        assert_eq!(Wander::intent_at(6.5).move_x, 1.0);
    }

    #[test]
    fn test_wander_drives_only_the_local_player() {
        let mut world = World::new();
        let local = world.spawn(
            ComponentSet::new()
                .with(PlayerTag)
                .with(LocalControlled)
                .with(Intent::default()),
        );
        let remote = world.spawn(ComponentSet::new().with(PlayerTag).with(Intent::default()));

        let mut wander = Wander::default();
        wander.update(&mut world, 0.1);

        assert_eq!(world.get::<Intent>(local).unwrap().move_x, 1.0);
        assert_eq!(world.get::<Intent>(remote).unwrap().move_x, 0.0);
    }
}

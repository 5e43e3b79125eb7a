use glam::Vec2;

use delve::net::LobbyData;
use delve::world::{
    ActiveMap, AnimationState, Facing, Intent, Life, OnMap, Owner, PlayerTag, Sprite, Transform,
};
use delve::{ComponentSet, EntityId, World};

const SPAWN_ORIGIN: Vec2 = Vec2::new(64.0, 64.0);
const SPAWN_SPACING: f32 = 32.0;

/// Seeds the authoritative world: the active map and one player per seat.
pub fn populate(world: &mut World, lobby: &LobbyData) -> Vec<EntityId> {
    world.spawn(ComponentSet::new().with(ActiveMap {
        id: lobby.map_id.clone(),
    }));

    lobby
        .heroes
        .iter()
        .enumerate()
        .map(|(i, (peer_id, hero))| {
            let position = SPAWN_ORIGIN + Vec2::new(i as f32 * SPAWN_SPACING, 0.0);
            log::debug!("spawning {} as {} at {}", peer_id, hero, position);
            world.spawn(
                ComponentSet::new()
                    .with(PlayerTag)
                    .with(Owner::new(peer_id.clone()))
                    .with(Transform::at(position))
                    .with(Facing::default())
                    .with(AnimationState::default())
                    .with(Life::default())
                    .with(Intent::default())
                    .with(Sprite::new(hero.clone()))
                    .with(OnMap::new(lobby.map_id.clone())),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use delve::ComponentKind;
    use delve::simulation::movement_system;

    use super::*;

    fn lobby() -> LobbyData {
        LobbyData {
            heroes: BTreeMap::from([
                ("host".to_string(), "hero.knight_blue".to_string()),
                ("peer:1".to_string(), "hero.knight_red".to_string()),
            ]),
            map_id: "level1".into(),
        }
    }

    #[test]
    fn populate_spawns_one_player_per_seat() {
        let mut world = World::new();
        let players = populate(&mut world, &lobby());

        assert_eq!(players.len(), 2);
        assert_eq!(world.query(ComponentKind::ACTIVE_MAP).count(), 1);
        let owner = world.get::<Owner>(players[1]).unwrap();
        assert_eq!(owner.peer_id, "peer:1");
        assert_eq!(
            world.get::<Transform>(players[1]).unwrap().position,
            Vec2::new(96.0, 64.0)
        );
    }

    #[test]
    fn spawned_players_move_by_intent() {
        let mut world = World::new();
        let players = populate(&mut world, &lobby());
        world.add(
            players[1],
            Intent {
                move_y: 1.0,
                ..Intent::default()
            },
        );

        movement_system(&mut world, 0.5);

        assert_eq!(
            world.get::<Transform>(players[1]).unwrap().position,
            Vec2::new(96.0, 112.0)
        );
        assert_eq!(
            world.get::<Transform>(players[0]).unwrap().position,
            Vec2::new(64.0, 64.0)
        );
    }
}

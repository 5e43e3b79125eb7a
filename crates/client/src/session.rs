use std::net::{IpAddr, SocketAddr};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use glam::Vec2;

use delve::lobby::{ClientLobby, HERO_CATALOG, JoinState, LobbySlot};
use delve::net::ClientDiscovery;
use delve::simulation::movement_system;
use delve::world::{
    AnimationState, Facing, Intent, Life, LocalControlled, Owner, PlayerTag, Transform,
};
use delve::{ComponentKind, ComponentSet, NetContext, SimulationLoop, World};

use crate::config::ClientConfig;
use crate::input::Wander;

const POLL: Duration = Duration::from_millis(10);
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Searches the LAN until a host answers or `timeout` runs out.
pub fn discover_host(config: &ClientConfig) -> Result<SocketAddr> {
    let target = SocketAddr::from(([255, 255, 255, 255], config.net.discovery_port));
    let discovery = ClientDiscovery::with_target(target, config.net.discovery_interval)
        .context("starting discovery")?;
    log::info!("searching for hosts on port {}", config.net.discovery_port);

    let started = Instant::now();
    while started.elapsed() < config.discovery_timeout {
        let mut hosts: Vec<_> = discovery.hosts().into_iter().collect();
        hosts.sort();

        for ((ip, port), name) in hosts {
            match ip.parse::<IpAddr>() {
                Ok(ip) => {
                    log::info!("found {} at {}:{}", name, ip, port);
                    return Ok(SocketAddr::new(ip, port));
                }
                Err(_) => log::debug!("skipping host {} with bad address {}", name, ip),
            }
        }

        thread::sleep(POLL);
    }

    bail!("no host answered within {:?}", config.discovery_timeout)
}

/// Joins `host`, picks a hero, readies up and waits for `START_GAME`.
pub fn join_lobby(host: SocketAddr, config: &ClientConfig) -> Result<NetContext> {
    let mut lobby = ClientLobby::connect(host, config.name.clone())
        .with_context(|| format!("connecting to {}", host))?;

    let started = Instant::now();
    let mut last_send: Option<Instant> = None;

    loop {
        let state = lobby.pump().clone();
        let retry_due = last_send.is_none_or(|at| at.elapsed() >= config.hello_retry);

        match state {
            JoinState::Started { .. } => break,
            JoinState::Denied(reason) => bail!("host denied the join: {}", reason),
            JoinState::Joined(_)
                if retry_due && seat_pending(lobby.local_slot(), config.hero_index) =>
            {
                lobby.select_hero(config.hero_index);
                lobby.set_ready(true);
                last_send = Some(Instant::now());
            }
            JoinState::Pending if retry_due => {
                lobby.join();
                last_send = Some(Instant::now());
            }
            _ => {}
        }

        if started.elapsed() >= config.join_timeout {
            lobby.leave();
            bail!("game did not start within {:?}", config.join_timeout);
        }

        thread::sleep(POLL);
    }

    lobby
        .into_context(config.net.clone())
        .map_err(|_| anyhow!("lobby left before the game started"))
}

/// True until the host's lobby state shows our hero choice and ready flag.
fn seat_pending(slot: Option<&LobbySlot>, hero_index: u32) -> bool {
    let hero_index = hero_index % HERO_CATALOG.len() as u32;
    slot.is_none_or(|slot| !slot.ready || slot.hero_index != hero_index)
}

fn local_player(peer_id: &str) -> ComponentSet {
    ComponentSet::new()
        .with(PlayerTag)
        .with(LocalControlled)
        .with(Owner::new(peer_id))
        .with(Transform::proxy())
        .with(Facing::default())
        .with(AnimationState::default())
        .with(Life::default())
        .with(Intent::default())
}

fn local_position(world: &World) -> Option<Vec2> {
    world
        .query(ComponentKind::LOCAL | ComponentKind::TRANSFORM)
        .find_map(|(_, set)| set.get::<Transform>().map(|t| t.position))
}

/// Runs the client world until `config.duration` elapses, if ever.
pub fn run_game(context: NetContext, config: &ClientConfig) -> Result<()> {
    let mut world = World::new();
    world.spawn(local_player(context.local_peer_id()));
    if config.wander {
        world.add_system(Wander::default());
    }
    if config.net.prediction {
        world.add_system(movement_system);
    }
    let identity = context
        .install(&mut world)
        .context("installing client networking")?;

    let mut sim = SimulationLoop::new(world, config.net.tick_rate);
    let started = Instant::now();
    let mut last_frame = started;
    let mut last_status = started;

    while config
        .duration
        .is_none_or(|duration| started.elapsed() < duration)
    {
        let now = Instant::now();
        sim.update((now - last_frame).as_secs_f32());
        last_frame = now;

        if now - last_status >= STATUS_INTERVAL {
            let remote = sim.world().query(ComponentKind::REMOTE).count();
            match local_position(sim.world()) {
                Some(position) => log::info!(
                    "{} at {} with {} remote entities",
                    identity.local_peer_id,
                    position,
                    remote
                ),
                None => log::info!("{} has no player yet", identity.local_peer_id),
            }
            last_status = now;
        }

        thread::sleep(Duration::from_millis(1));
    }

    log::info!("client stopped after {} ticks", sim.tick());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(hero_index: u32, ready: bool) -> LobbySlot {
        LobbySlot {
            peer_id: Some("peer:1".into()),
            is_local: true,
            hero_index,
            ready,
            ..LobbySlot::open(1)
        }
    }

    #[test]
    fn test_seat_update_resent_until_host_confirms() {
        assert!(seat_pending(None, 2));
        assert!(seat_pending(Some(&seat(2, false)), 2));
        assert!(seat_pending(Some(&seat(0, true)), 2));
        assert!(!seat_pending(Some(&seat(2, true)), 2));
        // The host stores the index modulo the catalogue.
        assert!(!seat_pending(Some(&seat(1, true)), 6));
    }

    #[test]
    fn test_local_player_is_unsynced_proxy() {
        let mut world = World::new();
        let id = world.spawn(local_player("peer:2"));

        let transform = world.get::<Transform>(id).unwrap();
        assert!(!transform.synced);
        assert_eq!(world.get::<Owner>(id).unwrap().peer_id, "peer:2");
        assert_eq!(local_position(&world), Some(Vec2::ZERO));
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

use delve::lobby::{HostLobby, LobbyEvent};
use delve::net::{HostAdvert, HostDiscovery};
use delve::simulation::movement_system;
use delve::{HostSocket, Lobby, NetContext, SimulationLoop, World};

use crate::config::HostConfig;
use crate::simulation::populate;

const LOBBY_POLL: Duration = Duration::from_millis(10);
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the lobby, then the authoritative gameplay loop, on one thread.
pub struct GameHost {
    config: HostConfig,
    running: Arc<AtomicBool>,
}

impl GameHost {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let Some(context) = self.run_lobby()? else {
            return Ok(());
        };
        self.run_game(context)
    }

    fn run_lobby(&mut self) -> Result<Option<NetContext>> {
        let bind = format!("{}:{}", self.config.bind, self.config.net.port);
        let socket =
            HostSocket::bind(bind.as_str()).with_context(|| format!("binding {}", bind))?;
        let game_port = socket.local_addr().port();
        log::info!("lobby open on {}", socket.local_addr());

        let mut discovery = if self.config.discovery {
            let advert = HostAdvert {
                name: self.config.name.clone(),
                game_port,
                ip: None,
            };
            let addr = SocketAddr::from(([0, 0, 0, 0], self.config.net.discovery_port));
            Some(HostDiscovery::bind(addr, advert).context("starting host discovery")?)
        } else {
            None
        };

        let lobby = Lobby::hosted(self.config.net.max_players).with_map(self.config.map_id.clone());
        let mut host = HostLobby::new(socket, lobby);
        // A headless host has nobody to press ready.
        host.update_local(Some(self.config.hero_index), Some(true));

        while self.running.load(Ordering::SeqCst) {
            for event in host.pump() {
                log_event(&event);
            }

            if host.lobby().occupied_count() >= self.config.min_players
                && host.try_start().is_some()
            {
                break;
            }

            thread::sleep(LOBBY_POLL);
        }

        if let Some(discovery) = discovery.as_mut() {
            discovery.close();
        }

        if host.started().is_none() {
            log::info!("lobby closed before the game started");
            return Ok(None);
        }

        host.into_context(self.config.net.clone())
            .map(Some)
            .map_err(|_| anyhow!("lobby started without lobby data"))
    }

    fn run_game(&mut self, context: NetContext) -> Result<()> {
        let lobby = context
            .lobby_data()
            .cloned()
            .ok_or_else(|| anyhow!("host context carries no lobby data"))?;

        let mut world = World::new();
        let players = populate(&mut world, &lobby);
        world.add_system(movement_system);
        // Networking last, so snapshots carry this tick's movement.
        context.install(&mut world).context("installing host networking")?;

        log::info!(
            "running {} at {} Hz with {} player(s)",
            lobby.map_id,
            self.config.net.tick_rate,
            players.len()
        );

        let mut sim = SimulationLoop::new(world, self.config.net.tick_rate);
        let started = Instant::now();
        let mut last_frame = started;
        let mut last_status = started;

        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            sim.update((now - last_frame).as_secs_f32());
            last_frame = now;

            if now - last_status >= STATUS_INTERVAL {
                log::info!(
                    "tick {} with {} entities",
                    sim.tick(),
                    sim.world().entity_count()
                );
                last_status = now;
            }

            if self
                .config
                .duration
                .is_some_and(|duration| started.elapsed() >= duration)
            {
                self.running.store(false, Ordering::SeqCst);
            }

            thread::sleep(Duration::from_millis(1));
        }

        log::info!("host stopped at tick {}", sim.tick());
        Ok(())
    }
}

fn log_event(event: &LobbyEvent) {
    match event {
        LobbyEvent::Joined { peer_id, addr } => log::info!("{} joined from {}", peer_id, addr),
        LobbyEvent::Denied { addr, reason } => {
            log::warn!("denied {}: {}", addr, reason.as_str())
        }
        LobbyEvent::Updated { peer_id } => log::debug!("{} updated their seat", peer_id),
        LobbyEvent::Left { peer_id } => log::info!("{} left", peer_id),
    }
}

use std::net::SocketAddr;

use crate::snapshot::build_world_snapshot;
use crate::world::{ComponentKind, EntityId, Intent, Owner, System, World};

use super::protocol::{DenyReason, Message, PROTOCOL_VERSION};
use super::transport::HostSocket;

/// Host-side networking for the gameplay phase.
#[derive(Debug)]
pub struct NetHostState {
    pub socket: HostSocket,
    pub tick: u32,
    pub accumulator: f32,
    pub send_interval: f32,
}

fn player_of(world: &World, peer_id: &str) -> Option<EntityId> {
    world.find(ComponentKind::PLAYER | ComponentKind::OWNER, |set| {
        set.get::<Owner>().is_some_and(|o| o.peer_id == peer_id)
    })
}

impl NetHostState {
    pub fn new(socket: HostSocket, send_interval: f32) -> Self {
        Self {
            socket,
            tick: 0,
            accumulator: 0.0,
            send_interval,
        }
    }

    /// Drains the socket, writing each peer's latest input onto its player.
    pub fn receive(&mut self, world: &mut World) {
        for (addr, message) in self.socket.receive_all() {
            match message {
                Message::Input {
                    protocol,
                    peer_id,
                    intent,
                    ..
                } => {
                    if protocol == PROTOCOL_VERSION {
                        self.apply_input(world, addr, &peer_id, intent);
                    }
                }
                Message::Hello { .. } => {
                    let deny = Message::JoinDeny {
                        reason: DenyReason::InProgress,
                    };
                    self.socket.send_raw(addr, &deny);
                }
                Message::Ping { time } => {
                    self.socket.send_raw(addr, &Message::Pong { time });
                }
                Message::Disconnect { peer_id } => {
                    if self.socket.peer_at(&addr) == Some(peer_id.as_str()) {
                        self.socket.unregister_peer(&peer_id);
                        if let Some(id) = player_of(world, &peer_id) {
                            world.queue_delete(id);
                        }
                    }
                }
                other => log::trace!("ignoring {} from {}", other.kind(), addr),
            }
        }
    }

    fn apply_input(&mut self, world: &mut World, addr: SocketAddr, peer_id: &str, intent: Intent) {
        if self.socket.peer_at(&addr) != Some(peer_id) {
            log::debug!("dropping input for {} from unregistered {}", peer_id, addr);
            return;
        }

        match player_of(world, peer_id) {
            Some(id) => {
                world.add(id, intent);
            }
            None => log::trace!("no player entity for {}", peer_id),
        }
    }

    /// Broadcasts a snapshot each time a send interval has elapsed.
    /// Returns the tick that went out.
    pub fn publish(&mut self, world: &World, dt: f32) -> Option<u32> {
        self.accumulator += dt;
        if self.accumulator < self.send_interval {
            return None;
        }

        self.accumulator -= self.send_interval;
        // Never burst to catch up after a stall.
        if self.accumulator >= self.send_interval {
            self.accumulator = 0.0;
        }

        self.tick = self.tick.wrapping_add(1);
        let snapshot = build_world_snapshot(world, self.tick);
        self.socket.broadcast(&Message::snapshot(snapshot));
        Some(self.tick)
    }
}

/// Receives inputs and publishes snapshots. Register it after the gameplay
/// systems so each snapshot carries the state they just produced.
#[derive(Debug)]
pub struct HostNetSystem {
    state: NetHostState,
}

impl HostNetSystem {
    pub fn new(state: NetHostState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &NetHostState {
        &self.state
    }
}

impl System for HostNetSystem {
    fn name(&self) -> &str {
        "host_net"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        self.state.receive(world);
        if let Some(tick) = self.state.publish(world, dt) {
            log::trace!("snapshot {} to {} peer(s)", tick, self.state.socket.peers().len());
        }
    }
}

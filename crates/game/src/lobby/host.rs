use std::net::SocketAddr;

use crate::net::{DenyReason, HostSocket, LobbyData, Message, NetConfig, NetContext};

use super::Lobby;

#[derive(Debug, Clone, PartialEq)]
pub enum LobbyEvent {
    Joined { peer_id: String, addr: SocketAddr },
    Denied { addr: SocketAddr, reason: DenyReason },
    Updated { peer_id: String },
    Left { peer_id: String },
}

/// The host end of the handshake: seats peers, relays seat changes and
/// announces the start.
#[derive(Debug)]
pub struct HostLobby {
    socket: HostSocket,
    lobby: Lobby,
    started: Option<LobbyData>,
}

impl HostLobby {
    pub fn new(socket: HostSocket, lobby: Lobby) -> Self {
        Self {
            socket,
            lobby,
            started: None,
        }
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn socket(&self) -> &HostSocket {
        &self.socket
    }

    pub fn started(&self) -> Option<&LobbyData> {
        self.started.as_ref()
    }

    /// Drains the socket and handles every lobby message in arrival order.
    pub fn pump(&mut self) -> Vec<LobbyEvent> {
        let mut events = Vec::new();

        for (addr, message) in self.socket.receive_all() {
            match message {
                Message::Hello { protocol, name } => {
                    if let Some(event) = self.handle_hello(addr, protocol, &name) {
                        events.push(event);
                    }
                }
                Message::LobbyUpdate {
                    peer_id,
                    hero_index,
                    ready,
                } => {
                    if self.socket.peer_at(&addr) != Some(peer_id.as_str()) {
                        log::debug!("ignoring lobby update for {} from {}", peer_id, addr);
                        continue;
                    }
                    if self.lobby.apply_update(&peer_id, hero_index, ready) {
                        self.broadcast_state();
                        events.push(LobbyEvent::Updated { peer_id });
                    }
                }
                Message::Disconnect { peer_id } => {
                    if self.socket.peer_at(&addr) == Some(peer_id.as_str()) {
                        self.remove_peer(&peer_id);
                        events.push(LobbyEvent::Left { peer_id });
                    }
                }
                Message::Ping { time } => {
                    self.socket.send_raw(addr, &Message::Pong { time });
                }
                other => log::trace!("ignoring {} from {} in lobby", other.kind(), addr),
            }
        }

        events
    }

    fn handle_hello(&mut self, addr: SocketAddr, protocol: u32, name: &str) -> Option<LobbyEvent> {
        // A repeated hello (lost welcome) gets the same answer again.
        if let Some(peer_id) = self.socket.peer_at(&addr).map(str::to_string) {
            self.socket.send_raw(addr, &Message::welcome(peer_id));
            self.send_state_to(addr);
            return None;
        }

        match self.lobby.join(protocol, name) {
            Ok(peer_id) => {
                self.socket.register_peer(&peer_id, addr);
                self.socket.send_raw(addr, &Message::welcome(peer_id.clone()));
                self.send_state_to(addr);

                let state = self.state_message();
                self.socket.broadcast_except(Some(&peer_id), &state);

                log::info!("{} joined as {} from {}", name, peer_id, addr);
                Some(LobbyEvent::Joined { peer_id, addr })
            }
            Err(reason) => {
                log::info!(
                    "denied join from {} (protocol {}): {}",
                    addr,
                    protocol,
                    reason
                );
                self.socket.send_raw(addr, &Message::JoinDeny { reason });
                Some(LobbyEvent::Denied { addr, reason })
            }
        }
    }

    fn state_message(&self) -> Message {
        Message::LobbyState {
            slots: self.lobby.slot_infos(),
        }
    }

    fn send_state_to(&mut self, addr: SocketAddr) {
        let state = self.state_message();
        self.socket.send_raw(addr, &state);
    }

    fn broadcast_state(&mut self) {
        let state = self.state_message();
        self.socket.broadcast(&state);
    }

    fn remove_peer(&mut self, peer_id: &str) {
        self.socket.unregister_peer(peer_id);
        if self.lobby.remove_peer(peer_id) {
            log::info!("{} left the lobby", peer_id);
            self.broadcast_state();
        }
    }

    /// Changes the host's own seat and tells everyone.
    pub fn update_local(&mut self, hero_index: Option<u32>, ready: Option<bool>) {
        let local = self
            .lobby
            .slots()
            .iter()
            .find(|s| s.is_local)
            .and_then(|s| s.peer_id.clone());

        if let Some(peer_id) = local
            && self.lobby.apply_update(&peer_id, hero_index, ready)
        {
            self.broadcast_state();
        }
    }

    /// Broadcasts `START_GAME` once every occupied seat is ready.
    pub fn try_start(&mut self) -> Option<LobbyData> {
        let data = self.lobby.start()?;
        self.socket.broadcast(&Message::StartGame {
            lobby: data.clone(),
        });
        log::info!(
            "starting {} with {} player(s)",
            data.map_id,
            data.heroes.len()
        );
        self.started = Some(data.clone());
        Some(data)
    }

    /// Hands the socket over to gameplay once the game has started.
    pub fn into_context(mut self, config: NetConfig) -> Result<NetContext, Self> {
        match self.started.take() {
            Some(data) => Ok(NetContext::host(self.socket, data, config)),
            None => Err(self),
        }
    }
}

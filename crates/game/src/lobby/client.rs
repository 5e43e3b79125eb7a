use std::io;
use std::net::SocketAddr;

use crate::net::{ClientSocket, DenyReason, LobbyData, Message, NetConfig, NetContext};

use super::LobbySlot;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum JoinState {
    #[default]
    Idle,
    Pending,
    Joined(String),
    Denied(DenyReason),
    Started {
        peer_id: String,
        lobby: LobbyData,
    },
}

impl JoinState {
    pub fn peer_id(&self) -> Option<&str> {
        match self {
            JoinState::Joined(peer_id) | JoinState::Started { peer_id, .. } => Some(peer_id),
            _ => None,
        }
    }
}

/// The joining end of the handshake. Mirrors the host's seat list and
/// edits only its own seat.
#[derive(Debug)]
pub struct ClientLobby {
    socket: ClientSocket,
    name: String,
    state: JoinState,
    slots: Vec<LobbySlot>,
}

impl ClientLobby {
    pub fn new(socket: ClientSocket, name: impl Into<String>) -> Self {
        Self {
            socket,
            name: name.into(),
            state: JoinState::Idle,
            slots: Vec::new(),
        }
    }

    pub fn connect(host: SocketAddr, name: impl Into<String>) -> io::Result<Self> {
        Ok(Self::new(ClientSocket::connect(host)?, name))
    }

    pub fn state(&self) -> &JoinState {
        &self.state
    }

    pub fn peer_id(&self) -> Option<&str> {
        self.state.peer_id()
    }

    pub fn slots(&self) -> &[LobbySlot] {
        &self.slots
    }

    pub fn local_slot(&self) -> Option<&LobbySlot> {
        self.slots.iter().find(|s| s.is_local)
    }

    pub fn socket(&self) -> &ClientSocket {
        &self.socket
    }

    /// Sends `HELLO`. Also retries after a denial or a lost welcome.
    pub fn join(&mut self) {
        if matches!(self.state, JoinState::Joined(_) | JoinState::Started { .. }) {
            return;
        }
        self.socket.send(&Message::hello(self.name.clone()));
        self.state = JoinState::Pending;
    }

    pub fn pump(&mut self) -> &JoinState {
        for message in self.socket.receive_all() {
            match message {
                Message::Welcome { peer_id, .. } if self.state == JoinState::Pending => {
                    log::info!("joined as {}", peer_id);
                    self.state = JoinState::Joined(peer_id);
                }
                Message::JoinDeny { reason } if self.state == JoinState::Pending => {
                    log::warn!("join denied: {}", reason);
                    self.state = JoinState::Denied(reason);
                }
                Message::LobbyState { slots } => {
                    let local = self.state.peer_id();
                    self.slots = slots
                        .iter()
                        .map(|info| LobbySlot::from_info(info, local))
                        .collect();
                }
                Message::StartGame { lobby } => {
                    if let JoinState::Joined(peer_id) = &self.state {
                        log::info!("game starting on {}", lobby.map_id);
                        self.state = JoinState::Started {
                            peer_id: peer_id.clone(),
                            lobby,
                        };
                    }
                }
                Message::Ping { time } => {
                    self.socket.send(&Message::Pong { time });
                }
                other => log::trace!("ignoring {} in lobby", other.kind()),
            }
        }

        &self.state
    }

    fn send_update(&mut self, hero_index: Option<u32>, ready: Option<bool>) -> bool {
        let JoinState::Joined(peer_id) = &self.state else {
            return false;
        };

        let message = Message::LobbyUpdate {
            peer_id: peer_id.clone(),
            hero_index,
            ready,
        };
        self.socket.send(&message)
    }

    pub fn select_hero(&mut self, hero_index: u32) -> bool {
        self.send_update(Some(hero_index), None)
    }

    pub fn set_ready(&mut self, ready: bool) -> bool {
        self.send_update(None, Some(ready))
    }

    /// Gives up the seat. The lobby is back to `Idle` afterwards.
    pub fn leave(&mut self) {
        if let JoinState::Joined(peer_id) = &self.state {
            let message = Message::Disconnect {
                peer_id: peer_id.clone(),
            };
            self.socket.send(&message);
        }
        self.state = JoinState::Idle;
        self.slots.clear();
    }

    /// Hands the socket over to gameplay once `START_GAME` has arrived.
    pub fn into_context(self, config: NetConfig) -> Result<NetContext, Self> {
        match self.state {
            JoinState::Started { peer_id, lobby } => {
                Ok(NetContext::client(self.socket, peer_id, lobby, config))
            }
            state => Err(Self { state, ..self }),
        }
    }
}

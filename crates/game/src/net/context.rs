use std::io;

use crate::smoothing::SmoothingSystem;
use crate::snapshot::ApplyOptions;
use crate::world::World;

use super::client::{ClientInputSendSystem, ClientNetSystem, InputSender, NetClientState};
use super::config::NetConfig;
use super::host::{HostNetSystem, NetHostState};
use super::protocol::{HOST_PEER_ID, LobbyData, SOLO_PEER_ID};
use super::transport::{ClientSocket, HostSocket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Solo,
    Host,
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetIdentity {
    pub local_peer_id: String,
    pub role: Role,
}

impl NetIdentity {
    pub fn solo() -> Self {
        Self {
            local_peer_id: SOLO_PEER_ID.to_string(),
            role: Role::Solo,
        }
    }

    pub fn host() -> Self {
        Self {
            local_peer_id: HOST_PEER_ID.to_string(),
            role: Role::Host,
        }
    }

    pub fn client(peer_id: impl Into<String>) -> Self {
        Self {
            local_peer_id: peer_id.into(),
            role: Role::Client,
        }
    }
}

#[derive(Debug)]
enum Link {
    Offline,
    Host(HostSocket),
    Client(ClientSocket),
}

/// Everything networking that outlives the lobby: who we are, the live
/// socket, and what the lobby agreed on. The lobby builds it and
/// [`NetContext::install`] moves it into the gameplay world.
#[derive(Debug)]
pub struct NetContext {
    identity: NetIdentity,
    config: NetConfig,
    lobby: Option<LobbyData>,
    link: Link,
}

impl NetContext {
    pub fn solo(config: NetConfig) -> Self {
        Self {
            identity: NetIdentity::solo(),
            config,
            lobby: None,
            link: Link::Offline,
        }
    }

    pub fn host(socket: HostSocket, lobby: LobbyData, config: NetConfig) -> Self {
        Self {
            identity: NetIdentity::host(),
            config,
            lobby: Some(lobby),
            link: Link::Host(socket),
        }
    }

    pub fn client(
        socket: ClientSocket,
        peer_id: impl Into<String>,
        lobby: LobbyData,
        config: NetConfig,
    ) -> Self {
        Self {
            identity: NetIdentity::client(peer_id),
            config,
            lobby: Some(lobby),
            link: Link::Client(socket),
        }
    }

    pub fn identity(&self) -> &NetIdentity {
        &self.identity
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn local_peer_id(&self) -> &str {
        &self.identity.local_peer_id
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn lobby_data(&self) -> Option<&LobbyData> {
        self.lobby.as_ref()
    }

    /// Registers the role's network systems on `world`, consuming the socket.
    ///
    /// Hosts get a single [`HostNetSystem`]; install it after the gameplay
    /// systems. Clients get snapshot receive, input send and smoothing, in
    /// that order; the input sender shares the receive socket.
    pub fn install(self, world: &mut World) -> io::Result<NetIdentity> {
        let config = self.config;

        match self.link {
            Link::Offline => {}
            Link::Host(socket) => {
                let state = NetHostState::new(socket, config.snapshot_interval());
                world.add_system(HostNetSystem::new(state));
            }
            Link::Client(socket) => {
                let sender = InputSender::new(
                    socket.share()?,
                    self.identity.local_peer_id.clone(),
                    config.input_interval(),
                );
                let options = ApplyOptions {
                    reconcile_threshold: config.reconcile_threshold,
                    prediction: config.prediction,
                };
                let state = NetClientState::new(socket, self.identity.local_peer_id.clone(), options)
                    .with_interpolation(config.interpolation);

                world.add_system(ClientNetSystem::new(state));
                world.add_system(ClientInputSendSystem::new(sender));
                world.add_system(if config.interpolation {
                    SmoothingSystem::new(config.smoothing_rate)
                } else {
                    SmoothingSystem::snapping()
                });
            }
        }

        log::info!(
            "network installed as {:?} ({})",
            self.identity.role,
            self.identity.local_peer_id
        );
        Ok(self.identity)
    }
}

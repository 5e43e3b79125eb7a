use crate::snapshot::{ApplyOptions, ApplyReport, HpEvent, SnapshotApplier};
use crate::world::{ComponentKind, Intent, System, World};

use super::protocol::{Message, PROTOCOL_VERSION};
use super::transport::ClientSocket;

/// Client-side networking for the gameplay phase.
#[derive(Debug)]
pub struct NetClientState {
    pub socket: ClientSocket,
    applier: SnapshotApplier,
    prediction: bool,
    interpolation: bool,
}

impl NetClientState {
    pub fn new(socket: ClientSocket, local_peer_id: impl Into<String>, options: ApplyOptions) -> Self {
        Self {
            socket,
            prediction: options.prediction,
            interpolation: true,
            applier: SnapshotApplier::new(local_peer_id, options),
        }
    }

    pub fn with_interpolation(mut self, interpolation: bool) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn prediction(&self) -> bool {
        self.prediction
    }

    pub fn interpolation(&self) -> bool {
        self.interpolation
    }

    pub fn local_peer_id(&self) -> &str {
        self.applier.local_peer_id()
    }

    pub fn last_snapshot_tick(&self) -> Option<u32> {
        self.applier.last_tick()
    }

    /// Applies every fresh snapshot waiting on the socket, oldest first.
    pub fn receive(&mut self, world: &mut World) -> Vec<ApplyReport> {
        let mut reports = Vec::new();

        for message in self.socket.receive_all() {
            match message {
                Message::Snapshot { protocol, snapshot } => {
                    if protocol != PROTOCOL_VERSION {
                        log::debug!("dropping snapshot with protocol {}", protocol);
                        continue;
                    }
                    if let Some(report) = self.applier.apply(world, &snapshot) {
                        reports.push(report);
                    }
                }
                Message::Ping { time } => {
                    self.socket.send(&Message::Pong { time });
                }
                Message::Disconnect { peer_id } => {
                    log::warn!("{} closed the session", peer_id);
                }
                other => log::trace!("ignoring {}", other.kind()),
            }
        }

        reports
    }
}

#[derive(Debug)]
pub struct ClientNetSystem {
    state: NetClientState,
}

impl ClientNetSystem {
    pub fn new(state: NetClientState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &NetClientState {
        &self.state
    }
}

impl System for ClientNetSystem {
    fn name(&self) -> &str {
        "client_net"
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        for report in self.state.receive(world) {
            match report.local_hp {
                Some(HpEvent::Death) => log::info!("local player died"),
                Some(HpEvent::Hit) => log::debug!("local player hit"),
                None => {}
            }
            if let Some(map_id) = &report.map_changed {
                log::info!("moved to map {}", map_id);
            }
        }
    }
}

/// Sends the local player's intent to the host at a fixed rate.
#[derive(Debug)]
pub struct InputSender {
    socket: ClientSocket,
    peer_id: String,
    pub tick: u32,
    pub accumulator: f32,
    pub send_interval: f32,
}

impl InputSender {
    pub fn new(socket: ClientSocket, peer_id: impl Into<String>, send_interval: f32) -> Self {
        Self {
            socket,
            peer_id: peer_id.into(),
            tick: 0,
            accumulator: 0.0,
            send_interval,
        }
    }

    /// Returns the input tick that went out, if one did.
    pub fn update(&mut self, world: &World, dt: f32) -> Option<u32> {
        self.accumulator += dt;
        if self.accumulator < self.send_interval {
            return None;
        }
        self.accumulator = (self.accumulator - self.send_interval).min(self.send_interval);

        let intent = world
            .query(ComponentKind::LOCAL | ComponentKind::INTENT)
            .find_map(|(_, set)| set.get::<Intent>().copied())?;

        self.tick = self.tick.wrapping_add(1);
        self.socket.send(&Message::Input {
            protocol: PROTOCOL_VERSION,
            peer_id: self.peer_id.clone(),
            tick: self.tick,
            intent,
        });
        Some(self.tick)
    }
}

#[derive(Debug)]
pub struct ClientInputSendSystem {
    sender: InputSender,
}

impl ClientInputSendSystem {
    pub fn new(sender: InputSender) -> Self {
        Self { sender }
    }
}

impl System for ClientInputSendSystem {
    fn name(&self) -> &str {
        "client_input_send"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        self.sender.update(world, dt);
    }
}

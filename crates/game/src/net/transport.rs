use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::codec;
use super::peers::PeerTable;
use super::protocol::{MAX_DATAGRAM_SIZE, Message};
use super::stats::NetStats;

/// Largest payload a single IPv4 UDP datagram can carry.
const MAX_UDP_PAYLOAD: usize = 65507;

/// Non-blocking UDP socket carrying one JSON message per datagram.
///
/// Sends are best-effort and receives drain until the socket would block.
/// Neither ever returns a transport error; failures are counted in
/// [`NetStats`] and logged.
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    stats: NetStats,
    recv_buffer: Box<[u8]>,
}

impl UdpEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        Self::from_socket(UdpSocket::bind(addr)?)
    }

    pub fn from_socket(socket: UdpSocket) -> io::Result<Self> {
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            stats: NetStats::default(),
            recv_buffer: vec![0u8; MAX_DATAGRAM_SIZE].into_boxed_slice(),
        })
    }

    /// Another handle onto the same OS socket. Each handle keeps its own stats.
    pub fn try_clone(&self) -> io::Result<Self> {
        Self::from_socket(self.socket.try_clone()?)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &NetStats {
        &self.stats
    }

    /// Returns whether the datagram was handed to the OS.
    pub fn send_to<T: Serialize>(&mut self, addr: SocketAddr, message: &T) -> bool {
        let data = match codec::encode(message) {
            Ok(data) => data,
            Err(e) => {
                self.stats.send_errors += 1;
                log::warn!("failed to encode message for {}: {}", addr, e);
                return false;
            }
        };

        if data.len() > MAX_UDP_PAYLOAD {
            self.stats.oversized_drops += 1;
            log::warn!(
                "dropping {} byte datagram to {}: exceeds UDP payload limit",
                data.len(),
                addr
            );
            return false;
        }

        match self.socket.send_to(&data, addr) {
            Ok(bytes) => {
                self.stats.record_sent(bytes);
                true
            }
            Err(e) => {
                self.stats.send_errors += 1;
                log::debug!("send to {} failed: {}", addr, e);
                false
            }
        }
    }

    pub fn receive_all<T: DeserializeOwned>(&mut self) -> Vec<(SocketAddr, T)> {
        let mut messages = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((size, addr)) => match codec::decode::<T>(&self.recv_buffer[..size]) {
                    Ok(message) => {
                        self.stats.record_received(size);
                        messages.push((addr, message));
                    }
                    Err(e) => {
                        self.stats.decode_errors += 1;
                        log::debug!("dropping undecodable datagram from {}: {}", addr, e);
                    }
                },
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // ICMP port-unreachable from an earlier send surfaces here on some platforms.
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
                    ) =>
                {
                    self.stats.receive_errors += 1;
                    continue;
                }
                Err(e) => {
                    self.stats.receive_errors += 1;
                    log::debug!("receive failed on {}: {}", self.local_addr, e);
                    break;
                }
            }
        }

        messages
    }
}

/// The authoritative host's socket plus its `peer_id <-> address` table.
#[derive(Debug)]
pub struct HostSocket {
    endpoint: UdpEndpoint,
    peers: PeerTable,
}

impl HostSocket {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        Ok(Self {
            endpoint: UdpEndpoint::bind(addr)?,
            peers: PeerTable::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn stats(&self) -> &NetStats {
        self.endpoint.stats()
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn receive_all(&mut self) -> Vec<(SocketAddr, Message)> {
        self.endpoint.receive_all()
    }

    pub fn send_raw(&mut self, addr: SocketAddr, message: &Message) -> bool {
        self.endpoint.send_to(addr, message)
    }

    pub fn send_to_peer(&mut self, peer_id: &str, message: &Message) -> bool {
        match self.peers.addr_of(peer_id) {
            Some(addr) => self.endpoint.send_to(addr, message),
            None => false,
        }
    }

    pub fn broadcast(&mut self, message: &Message) {
        self.broadcast_except(None, message);
    }

    pub fn broadcast_except(&mut self, skip: Option<&str>, message: &Message) {
        let targets: Vec<SocketAddr> = self
            .peers
            .peer_ids()
            .filter(|peer_id| Some(*peer_id) != skip)
            .filter_map(|peer_id| self.peers.addr_of(peer_id))
            .collect();

        for addr in targets {
            self.endpoint.send_to(addr, message);
        }
    }

    pub fn register_peer(&mut self, peer_id: &str, addr: SocketAddr) {
        log::info!("registered {} at {}", peer_id, addr);
        self.peers.register(peer_id, addr);
    }

    pub fn unregister_peer(&mut self, peer_id: &str) -> Option<SocketAddr> {
        let addr = self.peers.unregister(peer_id);
        if let Some(addr) = addr {
            log::info!("unregistered {} ({})", peer_id, addr);
        }
        addr
    }

    pub fn peer_at(&self, addr: &SocketAddr) -> Option<&str> {
        self.peers.peer_at(addr)
    }
}

/// A remote peer's socket, aimed at one host address.
#[derive(Debug)]
pub struct ClientSocket {
    endpoint: UdpEndpoint,
    remote: SocketAddr,
}

impl ClientSocket {
    /// Binds an ephemeral local port and targets `remote`.
    pub fn connect(remote: SocketAddr) -> io::Result<Self> {
        Self::bind("0.0.0.0:0", remote)
    }

    pub fn bind<A: ToSocketAddrs>(local: A, remote: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            endpoint: UdpEndpoint::bind(local)?,
            remote,
        })
    }

    /// A second handle on the same socket, for a system that sends while
    /// another receives.
    pub fn share(&self) -> io::Result<Self> {
        Ok(Self {
            endpoint: self.endpoint.try_clone()?,
            remote: self.remote,
        })
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn stats(&self) -> &NetStats {
        self.endpoint.stats()
    }

    pub fn send(&mut self, message: &Message) -> bool {
        self.endpoint.send_to(self.remote, message)
    }

    pub fn receive_all(&mut self) -> Vec<Message> {
        self.endpoint
            .receive_all()
            .into_iter()
            .map(|(_, message)| message)
            .collect()
    }
}

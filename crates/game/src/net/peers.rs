use std::collections::HashMap;
use std::net::SocketAddr;

/// Bidirectional `peer_id <-> address` map kept by the host.
#[derive(Debug, Default)]
pub struct PeerTable {
    addr_by_peer: HashMap<String, SocketAddr>,
    peer_by_addr: HashMap<SocketAddr, String>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `peer_id` at `addr`, replacing any previous mapping of either side.
    pub fn register(&mut self, peer_id: &str, addr: SocketAddr) {
        self.unregister(peer_id);
        self.unregister_addr(&addr);

        self.addr_by_peer.insert(peer_id.to_string(), addr);
        self.peer_by_addr.insert(addr, peer_id.to_string());
    }

    pub fn unregister(&mut self, peer_id: &str) -> Option<SocketAddr> {
        let addr = self.addr_by_peer.remove(peer_id)?;
        self.peer_by_addr.remove(&addr);
        Some(addr)
    }

    pub fn unregister_addr(&mut self, addr: &SocketAddr) -> Option<String> {
        let peer_id = self.peer_by_addr.remove(addr)?;
        self.addr_by_peer.remove(&peer_id);
        Some(peer_id)
    }

    pub fn addr_of(&self, peer_id: &str) -> Option<SocketAddr> {
        self.addr_by_peer.get(peer_id).copied()
    }

    pub fn peer_at(&self, addr: &SocketAddr) -> Option<&str> {
        self.peer_by_addr.get(addr).map(String::as_str)
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.addr_by_peer.contains_key(peer_id)
    }

    pub fn peer_ids(&self) -> impl Iterator<Item = &str> {
        self.addr_by_peer.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.addr_by_peer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addr_by_peer.is_empty()
    }
}

//! LAN host discovery on its own UDP port.
//!
//! Both halves run on a background thread and only share results through a
//! mutex, so nothing here ever blocks the caller's frame.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::codec;
use super::protocol::{DISCOVERY_MAGIC, DISCOVERY_PORT};

const HOST_POLL_TIMEOUT: Duration = Duration::from_millis(500);
const CLIENT_POLL_TIMEOUT: Duration = Duration::from_millis(50);
const DISCOVERY_BUFFER: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoveryMessage {
    Discover {
        magic: String,
    },
    HostAd {
        magic: String,
        ip: String,
        port: u16,
        name: String,
    },
}

impl DiscoveryMessage {
    pub fn discover() -> Self {
        DiscoveryMessage::Discover {
            magic: DISCOVERY_MAGIC.to_string(),
        }
    }

    fn has_magic(&self) -> bool {
        match self {
            DiscoveryMessage::Discover { magic } | DiscoveryMessage::HostAd { magic, .. } => {
                magic == DISCOVERY_MAGIC
            }
        }
    }
}

/// Best guess at the address other machines on the LAN can reach us on.
/// Connecting a UDP socket sends nothing; it only makes the OS pick a route.
pub fn lan_ip() -> IpAddr {
    let route = || -> io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("192.168.1.1:80")?;
        Ok(socket.local_addr()?.ip())
    };

    route().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// What a host advertises in its `host_ad` replies.
#[derive(Debug, Clone)]
pub struct HostAdvert {
    pub name: String,
    pub game_port: u16,
    /// Overrides [`lan_ip`] when set.
    pub ip: Option<IpAddr>,
}

/// Answers `discover` broadcasts with this host's address.
#[derive(Debug)]
pub struct HostDiscovery {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl HostDiscovery {
    /// Listens on every interface at [`DISCOVERY_PORT`].
    pub fn start(advert: HostAdvert) -> io::Result<Self> {
        Self::bind(SocketAddr::from(([0, 0, 0, 0], DISCOVERY_PORT)), advert)
    }

    pub fn bind(addr: SocketAddr, advert: HostAdvert) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(HOST_POLL_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("host-discovery".into())
            .spawn(move || respond_loop(socket, advert, flag))?;

        log::info!("host discovery listening on {}", local_addr);

        Ok(Self {
            local_addr,
            running,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn close(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for HostDiscovery {
    fn drop(&mut self) {
        self.close();
    }
}

fn respond_loop(socket: UdpSocket, advert: HostAdvert, running: Arc<AtomicBool>) {
    let mut buffer = [0u8; DISCOVERY_BUFFER];

    while running.load(Ordering::Relaxed) {
        let (size, from) = match socket.recv_from(&mut buffer) {
            Ok(received) => received,
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => {
                log::debug!("host discovery receive failed: {}", e);
                continue;
            }
        };

        let Ok(message) = codec::decode::<DiscoveryMessage>(&buffer[..size]) else {
            continue;
        };
        if !matches!(message, DiscoveryMessage::Discover { .. }) || !message.has_magic() {
            continue;
        }

        let reply = DiscoveryMessage::HostAd {
            magic: DISCOVERY_MAGIC.to_string(),
            ip: advert.ip.unwrap_or_else(lan_ip).to_string(),
            port: advert.game_port,
            name: advert.name.clone(),
        };

        match codec::encode(&reply) {
            Ok(data) => {
                if let Err(e) = socket.send_to(&data, from) {
                    log::debug!("host_ad to {} failed: {}", from, e);
                }
            }
            Err(e) => log::warn!("failed to encode host_ad: {}", e),
        }
    }
}

/// Hosts found so far, keyed by `(ip, port)`.
pub type HostList = HashMap<(String, u16), String>;

/// Re-broadcasts `discover` on an interval and collects `host_ad` replies.
#[derive(Debug)]
pub struct ClientDiscovery {
    hosts: Arc<Mutex<HostList>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ClientDiscovery {
    /// Broadcasts to `255.255.255.255` on the discovery port.
    pub fn start(interval: Duration) -> io::Result<Self> {
        Self::with_target(
            SocketAddr::from(([255, 255, 255, 255], DISCOVERY_PORT)),
            interval,
        )
    }

    pub fn with_target(target: SocketAddr, interval: Duration) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(CLIENT_POLL_TIMEOUT))?;

        let hosts = Arc::new(Mutex::new(HostList::new()));
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let hosts = Arc::clone(&hosts);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("client-discovery".into())
                .spawn(move || search_loop(socket, target, interval, hosts, running))?
        };

        Ok(Self {
            hosts,
            running,
            thread: Some(thread),
        })
    }

    pub fn hosts(&self) -> HostList {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn close(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ClientDiscovery {
    fn drop(&mut self) {
        self.close();
    }
}

fn search_loop(
    socket: UdpSocket,
    target: SocketAddr,
    interval: Duration,
    hosts: Arc<Mutex<HostList>>,
    running: Arc<AtomicBool>,
) {
    let mut buffer = [0u8; DISCOVERY_BUFFER];
    let mut last_sent: Option<Instant> = None;

    let discover = match codec::encode(&DiscoveryMessage::discover()) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("failed to encode discover: {}", e);
            return;
        }
    };

    while running.load(Ordering::Relaxed) {
        if last_sent.is_none_or(|at| at.elapsed() >= interval) {
            if let Err(e) = socket.send_to(&discover, target) {
                log::debug!("discover broadcast to {} failed: {}", target, e);
            }
            last_sent = Some(Instant::now());
        }

        let size = match socket.recv_from(&mut buffer) {
            Ok((size, _)) => size,
            Err(_) => continue,
        };

        if let Ok(message) = codec::decode::<DiscoveryMessage>(&buffer[..size])
            && message.has_magic()
            && let DiscoveryMessage::HostAd { ip, port, name, .. } = message
        {
            hosts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert((ip, port), name);
        }
    }
}

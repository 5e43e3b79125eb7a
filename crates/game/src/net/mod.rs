mod client;
pub mod codec;
mod config;
mod context;
mod discovery;
mod error;
mod host;
mod peers;
mod protocol;
mod stats;
mod tcp;
mod transport;

pub use client::{ClientInputSendSystem, ClientNetSystem, InputSender, NetClientState};
pub use codec::{CodecError, StreamDecoder};
pub use config::NetConfig;
pub use context::{NetContext, NetIdentity, Role};
pub use discovery::{
    ClientDiscovery, DiscoveryMessage, HostAdvert, HostDiscovery, HostList, lan_ip,
};
pub use error::NetError;
pub use host::{HostNetSystem, NetHostState};
pub use peers::PeerTable;
pub use protocol::{
    DEFAULT_INPUT_RATE, DEFAULT_PORT, DEFAULT_SNAPSHOT_RATE, DEFAULT_TICK_RATE, DISCOVERY_MAGIC,
    DISCOVERY_PORT, DenyReason, HOST_PEER_ID, LobbyData, MAX_DATAGRAM_SIZE, MAX_PLAYERS, Message,
    PROTOCOL_VERSION, SOLO_PEER_ID, SlotInfo,
};
pub use stats::NetStats;
pub use tcp::{ConnectionId, StreamEvent, TcpClient, TcpServer};
pub use transport::{ClientSocket, HostSocket, UdpEndpoint};

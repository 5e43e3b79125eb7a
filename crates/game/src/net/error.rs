use std::io;

use super::codec::CodecError;
use super::tcp::ConnectionId;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
    #[error("not connected")]
    NotConnected,
}

//! Stream transport: newline-delimited JSON over TCP.
//!
//! `connect`/`accept` block and belong to the lobby phase. Every live
//! connection owns a reader thread whose only job is to decode lines and push
//! them onto a shared inbox; the owner drains that inbox once per tick.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::codec::{self, StreamDecoder};
use super::error::NetError;
use super::protocol::Message;

pub type ConnectionId = u32;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Message(Message),
    Closed,
}

type Inbox<T> = Arc<Mutex<VecDeque<T>>>;

fn push<T>(inbox: &Inbox<T>, item: T) {
    inbox
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push_back(item);
}

fn take_all<T>(inbox: &Inbox<T>) -> Vec<T> {
    inbox
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain(..)
        .collect()
}

fn spawn_reader(
    mut stream: TcpStream,
    name: String,
    mut emit: impl FnMut(StreamEvent) + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name).spawn(move || {
        let mut decoder = StreamDecoder::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    for message in decoder.feed::<Message>(&chunk[..n]) {
                        emit(StreamEvent::Message(message));
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("stream read failed: {}", e);
                    break;
                }
            }
        }

        emit(StreamEvent::Closed);
    })
}

fn write_message(stream: &mut TcpStream, message: &Message) -> Result<(), NetError> {
    let line = codec::encode_line(message)?;
    stream.write_all(&line)?;
    stream.flush()?;
    Ok(())
}

#[derive(Debug)]
struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    open: bool,
    reader: Option<JoinHandle<()>>,
}

impl Connection {
    fn close(&mut self) {
        if self.open {
            self.open = false;
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }
}

#[derive(Debug)]
pub struct TcpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    connections: HashMap<ConnectionId, Connection>,
    inbox: Inbox<(ConnectionId, StreamEvent)>,
    next_id: ConnectionId,
}

impl TcpServer {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            connections: HashMap::new(),
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            next_id: 1,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Blocks until a client connects.
    pub fn accept(&mut self) -> io::Result<ConnectionId> {
        let (stream, peer_addr) = self.listener.accept()?;
        self.adopt(stream, peer_addr)
    }

    /// Accepts one pending client without blocking.
    pub fn poll_accept(&mut self) -> io::Result<Option<ConnectionId>> {
        self.listener.set_nonblocking(true)?;
        let accepted = self.listener.accept();
        self.listener.set_nonblocking(false)?;

        match accepted {
            Ok((stream, peer_addr)) => {
                stream.set_nonblocking(false)?;
                self.adopt(stream, peer_addr).map(Some)
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn adopt(&mut self, stream: TcpStream, peer_addr: SocketAddr) -> io::Result<ConnectionId> {
        stream.set_nodelay(true)?;

        let id = self.next_id;
        self.next_id += 1;

        let inbox = Arc::clone(&self.inbox);
        let reader = spawn_reader(
            stream.try_clone()?,
            format!("tcp-conn-{}", id),
            move |event| push(&inbox, (id, event)),
        )?;

        log::info!("accepted connection {} from {}", id, peer_addr);
        self.connections.insert(
            id,
            Connection {
                stream,
                peer_addr,
                open: true,
                reader: Some(reader),
            },
        );

        Ok(id)
    }

    /// Sends to one connection. A failed write closes it; it stays unusable
    /// until [`TcpServer::cleanup_closed`] removes it.
    pub fn send(&mut self, id: ConnectionId, message: &Message) -> Result<(), NetError> {
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(NetError::UnknownConnection(id))?;

        if !connection.open {
            return Err(NetError::ConnectionClosed(id));
        }

        if let Err(e) = write_message(&mut connection.stream, message) {
            log::debug!("send to connection {} failed: {}", id, e);
            connection.close();
            return Err(e);
        }

        Ok(())
    }

    /// Sends to every open connection, returning the ids whose send failed.
    pub fn broadcast(&mut self, message: &Message) -> Vec<ConnectionId> {
        let ids: Vec<ConnectionId> = self.open_connections().collect();
        ids.into_iter()
            .filter(|&id| self.send(id, message).is_err())
            .collect()
    }

    /// Messages received since the last drain. Connections whose reader hit
    /// end-of-stream are marked closed.
    pub fn drain(&mut self) -> Vec<(ConnectionId, Message)> {
        let mut messages = Vec::new();

        for (id, event) in take_all(&self.inbox) {
            match event {
                StreamEvent::Message(message) => messages.push((id, message)),
                StreamEvent::Closed => {
                    if let Some(connection) = self.connections.get_mut(&id) {
                        log::info!("connection {} closed by peer", id);
                        connection.close();
                    }
                }
            }
        }

        messages
    }

    /// Removes closed connections and returns their ids so the owner can
    /// release whatever it keyed on them.
    pub fn cleanup_closed(&mut self) -> Vec<ConnectionId> {
        let closed: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, c)| !c.open)
            .map(|(&id, _)| id)
            .collect();

        for id in &closed {
            if let Some(mut connection) = self.connections.remove(id)
                && let Some(reader) = connection.reader.take()
            {
                let _ = reader.join();
            }
        }

        closed
    }

    pub fn disconnect(&mut self, id: ConnectionId) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.close();
        }
    }

    pub fn is_open(&self, id: ConnectionId) -> bool {
        self.connections.get(&id).is_some_and(|c| c.open)
    }

    pub fn peer_addr(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.connections.get(&id).map(|c| c.peer_addr)
    }

    pub fn open_connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections
            .iter()
            .filter(|(_, c)| c.open)
            .map(|(&id, _)| id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        for connection in self.connections.values_mut() {
            connection.close();
        }
    }
}

#[derive(Debug)]
pub struct TcpClient {
    stream: TcpStream,
    inbox: Inbox<StreamEvent>,
    open: bool,
    reader: Option<JoinHandle<()>>,
}

impl TcpClient {
    /// Blocks until the connection is established.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        Self::from_stream(TcpStream::connect(addr)?)
    }

    pub fn connect_timeout(addr: SocketAddr, timeout: Duration) -> io::Result<Self> {
        Self::from_stream(TcpStream::connect_timeout(&addr, timeout)?)
    }

    fn from_stream(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;

        let inbox: Inbox<StreamEvent> = Arc::new(Mutex::new(VecDeque::new()));
        let reader_inbox = Arc::clone(&inbox);
        let reader = spawn_reader(stream.try_clone()?, "tcp-client".into(), move |event| {
            push(&reader_inbox, event)
        })?;

        Ok(Self {
            stream,
            inbox,
            open: true,
            reader: Some(reader),
        })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn send(&mut self, message: &Message) -> Result<(), NetError> {
        if !self.open {
            return Err(NetError::NotConnected);
        }

        if let Err(e) = write_message(&mut self.stream, message) {
            self.close();
            return Err(e);
        }

        Ok(())
    }

    pub fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        for event in take_all(&self.inbox) {
            match event {
                StreamEvent::Message(message) => messages.push(message),
                StreamEvent::Closed => self.open = false,
            }
        }
        messages
    }

    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            let _ = self.stream.shutdown(Shutdown::Both);
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for TcpClient {
    fn drop(&mut self) {
        self.close();
    }
}

//! One TCP connection to the lobby server.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lightcycle_protocol::{Codec, ConnectRequest, ConnectResponse, JsonCodec, Message};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::stream::{LineReader, MessageStream, trim_line};
use crate::{ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Who owns the read half right now.
enum ReadSlot {
    /// Available for the handshake or a new stream.
    Idle(LineReader),
    /// A [`MessageStream`] task holds it.
    Streaming,
    /// EOF, read error or closed.
    Gone,
}

/// The fields of a connect request that the caller chooses.
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    pub name: String,
    pub privacy: String,
    pub group_id: Option<String>,
    pub timeout: Duration,
}

impl HandshakeRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privacy: "private".to_string(),
            group_id: None,
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// An open (or closed) connection to the server.
///
/// Exactly one reader exists at a time: either the handshake, or a single
/// [`MessageStream`] task. Writes go straight to the socket from whoever
/// owns the session.
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    writer: Option<OwnedWriteHalf>,
    reader: ReadSlot,
    /// Messages read by a stopped stream but never consumed; replayed
    /// first by the next stream.
    pending: VecDeque<Message>,
    codec: JsonCodec,
}

impl Session {
    /// Opens a connection. Does not talk the protocol yet.
    ///
    /// # Errors
    /// [`TransportError::ConnectFailed`] or [`TransportError::ConnectTimeout`].
    pub async fn connect(
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let target = format!("{address}:{port}");
        let stream = time::timeout(timeout, TcpStream::connect(&target))
            .await
            .map_err(|_| TransportError::ConnectTimeout(target.clone()))?
            .map_err(|source| TransportError::ConnectFailed {
                addr: target.clone(),
                source,
            })?;
        let peer = stream
            .peer_addr()
            .map_err(|source| TransportError::ConnectFailed {
                addr: target.clone(),
                source,
            })?;
        // Lines are small and latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "could not disable Nagle");
        }

        let (read_half, write_half) = stream.into_split();
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        info!(conn = %id, %peer, "connected");

        Ok(Self {
            id,
            peer,
            writer: Some(write_half),
            reader: ReadSlot::Idle(BufReader::new(read_half).split(b'\n')),
            pending: VecDeque::new(),
            codec: JsonCodec,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// `false` once [`close`](Self::close) has been called.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Encodes `msg` and writes it followed by one `\n`.
    ///
    /// Delivery is at-most-once: a failed write is neither retried nor
    /// rolled back.
    ///
    /// # Errors
    /// [`TransportError::NotConnected`] after `close`, otherwise
    /// [`TransportError::SendFailed`] or [`TransportError::Protocol`].
    pub async fn send(&mut self, msg: &Message) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::NotConnected)?;
        let mut line = self.codec.encode(msg)?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .map_err(TransportError::SendFailed)?;
        trace!(conn = %self.id, kind = %msg.kind(), "message sent");
        Ok(())
    }

    /// Sends a connect request and reads exactly one connect response
    /// directly from the socket.
    ///
    /// Must run before [`receive_stream`](Self::receive_stream); it fails
    /// with [`TransportError::ReaderBusy`] while a stream is active.
    pub async fn handshake(
        &mut self,
        request: &HandshakeRequest,
    ) -> Result<ConnectResponse, TransportError> {
        match self.reader {
            ReadSlot::Idle(_) => {}
            ReadSlot::Streaming => return Err(TransportError::ReaderBusy),
            ReadSlot::Gone => return Err(TransportError::ConnectionClosed),
        }

        debug!(conn = %self.id, name = %request.name, "sending connect request");
        self.send(&Message::ConnectRequest(ConnectRequest {
            name: request.name.clone(),
            group_id: request.group_id.clone(),
            privacy: request.privacy.clone(),
        }))
        .await?;

        let ReadSlot::Idle(reader) = &mut self.reader else {
            return Err(TransportError::ReaderBusy);
        };
        let line = loop {
            let line = time::timeout(request.timeout, reader.next_segment())
                .await
                .map_err(|_| TransportError::HandshakeTimeout)?
                .map_err(TransportError::ReceiveFailed)?
                .ok_or(TransportError::ConnectionClosed)?;
            if let Some(line) = trim_line(&line) {
                break line.to_vec();
            }
        };

        match self.codec.decode(&line)? {
            Message::ConnectResponse(resp) => {
                info!(
                    conn = %self.id,
                    color = %resp.color,
                    players = resp.players.len(),
                    "connect response received"
                );
                Ok(resp)
            }
            other => Err(TransportError::UnexpectedMessage(other.kind())),
        }
    }

    /// Starts the background receive loop and returns its stream.
    ///
    /// # Errors
    /// [`TransportError::ReaderBusy`] if a stream is already running,
    /// [`TransportError::ConnectionClosed`] if the connection can no longer
    /// be read.
    pub fn receive_stream(&mut self) -> Result<MessageStream, TransportError> {
        match std::mem::replace(&mut self.reader, ReadSlot::Streaming) {
            ReadSlot::Idle(reader) => Ok(MessageStream::spawn(
                self.id,
                reader,
                self.codec,
                self.pending.drain(..),
            )),
            ReadSlot::Streaming => Err(TransportError::ReaderBusy),
            ReadSlot::Gone => {
                self.reader = ReadSlot::Gone;
                Err(TransportError::ConnectionClosed)
            }
        }
    }

    /// Stops `stream` and takes the read half back without closing the
    /// connection. Messages the stream had decoded but nobody consumed are
    /// kept for the next stream.
    pub async fn reclaim(&mut self, stream: MessageStream) {
        if stream.connection_id() != self.id {
            warn!(conn = %self.id, other = %stream.connection_id(), "reclaiming a foreign stream");
        }
        let (reader, leftover) = stream.shutdown().await;
        self.pending.extend(leftover);
        self.reader = match reader {
            Some(reader) if self.is_open() => ReadSlot::Idle(reader),
            _ => ReadSlot::Gone,
        };
        debug!(conn = %self.id, pending = self.pending.len(), "read half reclaimed");
    }

    /// Closes the connection. Later `send` calls fail with
    /// [`TransportError::NotConnected`]; calling it again does nothing.
    ///
    /// Stop any running stream (via [`reclaim`](Self::reclaim)) first; the
    /// socket is fully released once its read half is dropped too.
    pub async fn close(&mut self) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        if let Err(e) = writer.shutdown().await {
            debug!(conn = %self.id, error = %e, "shutdown failed");
        }
        self.reader = ReadSlot::Gone;
        self.pending.clear();
        info!(conn = %self.id, "connection closed");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("open", &self.is_open())
            .field("pending", &self.pending.len())
            .finish()
    }
}

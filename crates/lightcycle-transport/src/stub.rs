//! A throwaway stand-in for the lobby server, for tests.
//!
//! It accepts one client on an ephemeral loopback port, reads the connect
//! request, answers with a fixed roster, and then lets the test script the
//! rest of the conversation line by line.

use std::net::SocketAddr;

use lightcycle_protocol::{
    Codec, ConnectRequest, ConnectResponse, JsonCodec, LobbyPlayer, Message, Origin, PlayerColor,
};
use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::debug;

use crate::TransportError;
use crate::stream::{LineReader, trim_line};

/// Listening half of the stub.
pub struct StubServer {
    listener: TcpListener,
    color: PlayerColor,
    roster: Vec<LobbyPlayer>,
    group_id: String,
}

impl StubServer {
    /// Binds `127.0.0.1:0`. `color` is what the connecting client will be
    /// assigned; `roster` is everyone else, in order.
    pub async fn bind(
        color: impl Into<PlayerColor>,
        roster: Vec<LobbyPlayer>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(TransportError::BindFailed)?;
        Ok(Self {
            listener,
            color: color.into(),
            roster,
            group_id: generate_group_id(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::BindFailed)
    }

    /// Port to pass to `/connect 127.0.0.1 <port>`.
    pub fn port(&self) -> u16 {
        self.listener.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    /// The group id the stub will hand out.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Accepts one client, reads its connect request and answers it.
    pub async fn accept(self) -> Result<StubPeer, TransportError> {
        let response = ConnectResponse {
            color: self.color.clone(),
            players: self.roster.clone(),
            group_id: self.group_id.clone(),
        };
        let mut peer = self.accept_without_reply().await?;
        peer.send(&Message::ConnectResponse(response)).await?;
        Ok(peer)
    }

    /// Accepts one client and reads its connect request, but never
    /// answers. Useful for handshake timeouts.
    pub async fn accept_without_reply(self) -> Result<StubPeer, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::BindFailed)?;
        debug!(%addr, "stub accepted client");
        let (read_half, writer) = stream.into_split();
        let mut peer = StubPeer {
            reader: BufReader::new(read_half).split(b'\n'),
            writer,
            request: None,
        };
        match peer.recv().await? {
            Some(Message::ConnectRequest(req)) => peer.request = Some(req),
            Some(other) => return Err(TransportError::UnexpectedMessage(other.kind())),
            None => return Err(TransportError::ConnectionClosed),
        }
        Ok(peer)
    }
}

/// The stub's side of an accepted connection.
pub struct StubPeer {
    reader: LineReader,
    writer: OwnedWriteHalf,
    request: Option<ConnectRequest>,
}

impl StubPeer {
    /// The connect request the client opened with.
    pub fn request(&self) -> Option<&ConnectRequest> {
        self.request.as_ref()
    }

    /// Sends a message to the client.
    pub async fn send(&mut self, msg: &Message) -> Result<(), TransportError> {
        let mut line = JsonCodec.encode(msg)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(TransportError::SendFailed)
    }

    /// Writes raw text; a trailing newline is added.
    pub async fn send_raw(&mut self, line: &str) -> Result<(), TransportError> {
        self.send_bytes(line.as_bytes()).await
    }

    /// Writes arbitrary bytes followed by a newline, UTF-8 or not.
    pub async fn send_bytes(&mut self, line: &[u8]) -> Result<(), TransportError> {
        let mut bytes = line.to_vec();
        bytes.push(b'\n');
        self.writer
            .write_all(&bytes)
            .await
            .map_err(TransportError::SendFailed)
    }

    /// Reads the next message the client sent. `None` on EOF.
    pub async fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        loop {
            let Some(line) = self
                .reader
                .next_segment()
                .await
                .map_err(TransportError::ReceiveFailed)?
            else {
                return Ok(None);
            };
            let Some(line) = trim_line(&line) else {
                continue;
            };
            return Ok(Some(JsonCodec.decode_from(Origin::Client, line)?));
        }
    }

    /// Drops the connection from the server side.
    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
    }
}

/// A random 16-character hex group id.
fn generate_group_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

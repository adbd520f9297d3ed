//! Transport layer for the lightcycle client.
//!
//! A [`Session`] owns one TCP connection to the lobby server. Messages are
//! framed as one JSON object per line:
//!
//! - [`Session::send`] encodes a [`Message`](lightcycle_protocol::Message)
//!   and writes it with a single trailing `\n`.
//! - [`Session::handshake`] performs the one synchronous connect
//!   request/response exchange.
//! - [`Session::receive_stream`] hands the read half to a background task
//!   that yields decoded messages through a [`MessageStream`].
//!   [`Session::reclaim`] stops that task and takes the read half back, so
//!   the lobby and the game can read the same connection one after the
//!   other.
//!
//! [`StubServer`] stands in for the real server in tests.

mod error;
mod session;
mod stream;
mod stub;

pub use error::TransportError;
pub use session::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT, HandshakeRequest, Session};
pub use stream::MessageStream;
pub use stub::{StubPeer, StubServer};

use std::fmt;

/// Per-process session number, shown in log fields as `session-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

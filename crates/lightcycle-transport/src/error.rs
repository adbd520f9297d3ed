use lightcycle_protocol::{MessageKind, ProtocolError};

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the server failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Dialing the server took longer than the configured limit.
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    /// The session was closed; nothing can be sent any more.
    #[error("not connected")]
    NotConnected,

    /// Writing to the socket failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading from the socket failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// No connect response arrived within the configured limit.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// The handshake read produced a message other than the one expected.
    #[error("unexpected {0} message")]
    UnexpectedMessage(MessageKind),

    /// A receive stream already owns the read half.
    #[error("connection is already being read")]
    ReaderBusy,

    /// Binding the stub server failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Encoding or decoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

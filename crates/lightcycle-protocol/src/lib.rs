//! Wire protocol for the lightcycle client.
//!
//! - **Types** ([`Message`], [`LobbyPlayer`], [`Direction`], ...): what
//!   travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): one JSON object per
//!   line, decoded in two steps: the `type` tag first, then the payload.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (lines) → Protocol (Message) → Lobby / Game
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Chat, ConnectRequest, ConnectResponse, Direction, GameChange, LobbyPlayer, Message,
    MessageKind, Origin, PlayerColor, PlayerEvent, Ready, RosterAction, RosterChange, Tick,
};

//! Wire types for the lightcycle protocol.
//!
//! Every message is one JSON object per line with a `type` field naming the
//! variant. The payload structs below hold only the variant's own fields;
//! the `type` tag is added and stripped by the codec (see
//! [`crate::JsonCodec`]) so that decoding can peek at the tag first and
//! then pick the matching schema.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque token identifying a player within one session.
///
/// The server assigns colors; the client never invents one. It is the join
/// key between lobby roster entries and simulation entities.
///
/// `#[serde(transparent)]` keeps it a bare string on the wire
/// (`"#FF0000"`, not `{"0": "#FF0000"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerColor(pub String);

impl PlayerColor {
    /// Creates a color from anything string-like.
    pub fn new(color: impl Into<String>) -> Self {
        Self(color.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` until the server has assigned a color.
    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerColor {
    fn from(color: &str) -> Self {
        Self(color.to_string())
    }
}

/// A roster entry as the server describes it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub color: PlayerColor,
    pub name: String,
    pub ready: bool,
}

impl LobbyPlayer {
    pub fn new(color: impl Into<PlayerColor>, name: impl Into<String>, ready: bool) -> Self {
        Self {
            color: color.into(),
            name: name.into(),
            ready,
        }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Heading of a light cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four headings, in a fixed order.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// The 180° reversal of this heading.
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads an optional direction where both a missing field and `""` mean
/// "no change".
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Direction>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => Direction::from_wire(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::unknown_variant(s, &["up", "down", "left", "right"])),
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Client → server: join a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub name: String,
    /// Group to join; omitted to let the server pick.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub privacy: String,
}

/// Server → client: the answer to [`ConnectRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    /// The color assigned to this client.
    pub color: PlayerColor,
    /// Everyone else already in the lobby, in server order.
    #[serde(default)]
    pub players: Vec<LobbyPlayer>,
    #[serde(rename = "id", default)]
    pub group_id: String,
}

/// Either direction: a readiness flag. The client omits `color` (the
/// server knows who sent it); the server always includes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    pub value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<PlayerColor>,
}

/// Either direction: one chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub message: String,
    #[serde(default)]
    pub color: PlayerColor,
}

/// Interpreted value of [`RosterChange::action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterAction {
    Connect,
    Disconnect,
}

/// Server → client: a player joined or left the lobby.
///
/// `action` stays a raw string so that an unexpected value reaches the
/// lobby (which reports it) instead of failing the whole line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterChange {
    pub player: LobbyPlayer,
    pub action: String,
}

impl RosterChange {
    pub fn connected(player: LobbyPlayer) -> Self {
        Self {
            player,
            action: "connect".into(),
        }
    }

    pub fn disconnected(player: LobbyPlayer) -> Self {
        Self {
            player,
            action: "disconnect".into(),
        }
    }

    /// Servers in the wild send the truncated `"connec"`; both spellings
    /// are accepted.
    pub fn action(&self) -> Option<RosterAction> {
        match self.action.as_str() {
            "connect" | "connec" => Some(RosterAction::Connect),
            "disconnect" => Some(RosterAction::Disconnect),
            _ => None,
        }
    }
}

/// One player's server-asserted state for a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameChange {
    pub color: PlayerColor,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub dead: bool,
}

/// Server → client: advance the game by one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tick {
    #[serde(default)]
    pub countdown: i32,
    #[serde(default)]
    pub changes: Vec<GameChange>,
    #[serde(rename = "lasttick", default)]
    pub last_tick: bool,
}

/// Client → server: the local player wants to turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub color: PlayerColor,
    pub direction: Direction,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Which side produced a line. Needed because `connect` is used for both
/// the request and the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Server,
    Client,
}

/// The discriminant of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ConnectRequest,
    ConnectResponse,
    Ready,
    Chat,
    RosterChange,
    Tick,
    StartGame,
    PlayerEvent,
}

impl MessageKind {
    /// The `type` string used on the wire.
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::ConnectRequest | Self::ConnectResponse => "connect",
            Self::Ready => "ready",
            Self::Chat => "chat",
            Self::RosterChange => "connection",
            Self::Tick => "server_tick",
            Self::StartGame => "start_game",
            Self::PlayerEvent => "player_event",
        }
    }

    /// Resolves a wire tag, using `origin` to split the shared `connect` tag.
    pub fn from_wire_tag(tag: &str, origin: Origin) -> Option<Self> {
        let kind = match tag {
            "connect" => match origin {
                Origin::Server => Self::ConnectResponse,
                Origin::Client => Self::ConnectRequest,
            },
            "ready" => Self::Ready,
            "chat" => Self::Chat,
            "connection" => Self::RosterChange,
            "server_tick" => Self::Tick,
            "start_game" => Self::StartGame,
            "player_event" => Self::PlayerEvent,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_tag())
    }
}

/// Every message that travels between client and server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    ConnectRequest(ConnectRequest),
    ConnectResponse(ConnectResponse),
    Ready(Ready),
    Chat(Chat),
    RosterChange(RosterChange),
    Tick(Tick),
    StartGame,
    PlayerEvent(PlayerEvent),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::ConnectRequest(_) => MessageKind::ConnectRequest,
            Self::ConnectResponse(_) => MessageKind::ConnectResponse,
            Self::Ready(_) => MessageKind::Ready,
            Self::Chat(_) => MessageKind::Chat,
            Self::RosterChange(_) => MessageKind::RosterChange,
            Self::Tick(_) => MessageKind::Tick,
            Self::StartGame => MessageKind::StartGame,
            Self::PlayerEvent(_) => MessageKind::PlayerEvent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_opposite_is_an_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
        }
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Left).unwrap(), "\"left\"");
        let d: Direction = serde_json::from_str("\"up\"").unwrap();
        assert_eq!(d, Direction::Up);
    }

    #[test]
    fn test_player_color_is_a_bare_string() {
        let c = PlayerColor::new("#FF0000");
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#FF0000\"");
        assert_eq!(c.to_string(), "#FF0000");
        assert!(PlayerColor::default().is_unassigned());
    }

    #[test]
    fn test_roster_change_action_accepts_both_spellings() {
        let p = LobbyPlayer::new("#00FF00", "Zold", false);
        let mut change = RosterChange::connected(p);
        assert_eq!(change.action(), Some(RosterAction::Connect));
        change.action = "connec".into();
        assert_eq!(change.action(), Some(RosterAction::Connect));
        change.action = "disconnect".into();
        assert_eq!(change.action(), Some(RosterAction::Disconnect));
        change.action = "vanish".into();
        assert_eq!(change.action(), None);
    }

    #[test]
    fn test_game_change_empty_direction_means_none() {
        let c: GameChange =
            serde_json::from_str(r##"{"color":"#F00","direction":"","dead":false}"##).unwrap();
        assert_eq!(c.direction, None);

        let c: GameChange = serde_json::from_str(r##"{"color":"#F00","dead":true}"##).unwrap();
        assert_eq!(c.direction, None);
        assert!(c.dead);

        let c: GameChange =
            serde_json::from_str(r##"{"color":"#F00","direction":"right","dead":false}"##).unwrap();
        assert_eq!(c.direction, Some(Direction::Right));
    }

    #[test]
    fn test_game_change_rejects_unknown_direction() {
        let res: Result<GameChange, _> =
            serde_json::from_str(r##"{"color":"#F00","direction":"sideways","dead":false}"##);
        assert!(res.is_err());
    }

    #[test]
    fn test_tick_reads_lasttick_field() {
        let t: Tick =
            serde_json::from_str(r#"{"countdown":3,"changes":[],"lasttick":true}"#).unwrap();
        assert!(t.last_tick);
        assert_eq!(t.countdown, 3);
    }

    #[test]
    fn test_connect_request_omits_missing_group_id() {
        let req = ConnectRequest {
            name: "Buddy".into(),
            group_id: None,
            privacy: "private".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Buddy", "privacy": "private"}));
    }

    #[test]
    fn test_message_kind_splits_connect_by_origin() {
        assert_eq!(
            MessageKind::from_wire_tag("connect", Origin::Server),
            Some(MessageKind::ConnectResponse)
        );
        assert_eq!(
            MessageKind::from_wire_tag("connect", Origin::Client),
            Some(MessageKind::ConnectRequest)
        );
        assert_eq!(MessageKind::from_wire_tag("error", Origin::Server), None);
    }
}

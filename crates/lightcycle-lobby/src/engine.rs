//! The lobby engine: one owner for roster, chat and the connection.
//!
//! Local input lines and remote messages both arrive at the engine, and it
//! handles them one at a time. [`LobbyEngine::run`] selects over the two
//! sources; tests can instead call [`handle_line`](LobbyEngine::handle_line)
//! and [`pump_remote`](LobbyEngine::pump_remote) directly.
//!
//! Nothing here ever aborts the lobby. Connection problems and bad input
//! become system lines in the chat; protocol oddities are logged.

use lightcycle_protocol::{Chat, LobbyPlayer, Message, Ready, RosterAction, RosterChange};
use lightcycle_transport::{HandshakeRequest, MessageStream, Session};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{ChatDisplay, ChatHistory, DisplayKind, SYSTEM_SENDER};
use crate::commands::{CommandAction, CommandTable, InputLine};
use crate::roster::Roster;
use crate::{LobbyConfig, LobbyError, LobbyState};

const WELCOME: &str = "Hello! Good luck today. type '/help' for available commands";
const NOT_CONNECTED: &str = "You are not connected";

/// What the caller should do after a line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Exit,
}

/// Everything the game needs from the lobby.
#[derive(Debug)]
pub struct GameHandoff {
    /// Still open; its read half is idle and ready for a new stream.
    pub session: Session,
    pub me: LobbyPlayer,
    /// Local player first, then the others in roster order.
    pub players: Vec<LobbyPlayer>,
    pub group_id: String,
}

/// How [`LobbyEngine::run`] ended.
#[derive(Debug)]
pub enum LobbyOutcome {
    /// `/exit`, or the input channel closed.
    Exit,
    GameStarting(GameHandoff),
}

struct Connection {
    session: Session,
    stream: Option<MessageStream>,
}

/// Lobby state machine. See the [crate docs](crate).
pub struct LobbyEngine {
    config: LobbyConfig,
    commands: CommandTable,
    display: Box<dyn ChatDisplay>,
    history: ChatHistory,
    roster: Roster,
    group_id: Option<String>,
    state: LobbyState,
    connection: Option<Connection>,
}

impl LobbyEngine {
    /// Creates a disconnected lobby and greets the user.
    pub fn new(config: LobbyConfig, commands: CommandTable, display: DisplayKind) -> Self {
        let mut engine = Self {
            roster: Roster::new(config.name.clone()),
            config,
            commands,
            display: display.into_display(),
            history: ChatHistory::new(),
            group_id: None,
            state: LobbyState::Disconnected,
            connection: None,
        };
        engine.system(WELCOME);
        engine
    }

    /// A headless lobby with the standard command table.
    pub fn headless(config: LobbyConfig) -> Self {
        Self::new(config, CommandTable::standard(), DisplayKind::Headless)
    }

    pub fn state(&self) -> LobbyState {
        self.state
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Handles one line typed by the user.
    pub async fn handle_line(&mut self, line: &str) -> LineOutcome {
        match InputLine::parse(line) {
            InputLine::Empty => LineOutcome::Continue,
            InputLine::Chat(text) => {
                self.send_chat(text).await;
                LineOutcome::Continue
            }
            InputLine::Command { name, args } => self.dispatch(name, &args).await,
        }
    }

    async fn dispatch(&mut self, name: &str, args: &[&str]) -> LineOutcome {
        let Some(spec) = self.commands.get(name) else {
            self.system(&format!("Unknown command: '{name}'"));
            return LineOutcome::Continue;
        };
        let action = spec.action;
        if args.len() > spec.max_args {
            let usage = self.commands.usage(name).unwrap_or_else(|| name.to_string());
            self.system(&format!("Too many arguments. Usage: {usage}"));
            return LineOutcome::Continue;
        }

        debug!(command = name, ?action, args = args.len(), "command");
        let result = match action {
            CommandAction::Connect => {
                self.connect(args).await;
                Ok(())
            }
            CommandAction::Disconnect => self.disconnect().await,
            CommandAction::Players => self.list_players(),
            CommandAction::SetName => {
                self.set_name(args);
                Ok(())
            }
            CommandAction::Ready => self.ready(args).await,
            CommandAction::Help => {
                for line in self.commands.help_lines() {
                    self.system(&line);
                }
                Ok(())
            }
            CommandAction::Exit => return LineOutcome::Exit,
        };
        if let Err(e) = result {
            self.report(&e);
        }
        LineOutcome::Continue
    }

    /// Shows a failed command as a system line.
    fn report(&mut self, err: &LobbyError) {
        match err {
            LobbyError::NotConnected => self.system(NOT_CONNECTED),
            LobbyError::Transport(e) => {
                warn!(error = %e, "lobby send failed");
                self.system(&format!("Server error: {e}"));
            }
            other => self.system(&format!("Error: {other}")),
        }
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, LobbyError> {
        self.connection.as_mut().ok_or(LobbyError::NotConnected)
    }

    async fn connect(&mut self, args: &[&str]) {
        if self.connection.is_some() {
            self.system("You are already connected. Try to disconnect first with: '/disc[onnect]'");
            return;
        }
        let host = args.first().map_or(self.config.host.clone(), |h| h.to_string());
        let port = match args.get(1) {
            None => self.config.port,
            Some(raw) => match raw.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    self.system("Port is not a valid number.");
                    return;
                }
            },
        };

        self.transition(LobbyState::Connecting);
        let mut session = match Session::connect(&host, port, self.config.connect_timeout).await {
            Ok(session) => session,
            Err(e) => {
                warn!(%host, port, error = %e, "connect failed");
                self.transition(LobbyState::Disconnected);
                self.system("Could not connect to server");
                return;
            }
        };

        let request = HandshakeRequest {
            name: self.roster.me().name.clone(),
            privacy: self.config.privacy.clone(),
            group_id: self.config.group_id.clone(),
            timeout: self.config.handshake_timeout,
        };
        let response = match session.handshake(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%host, port, error = %e, "handshake failed");
                session.close().await;
                self.transition(LobbyState::Disconnected);
                self.system(&format!("Server error: {e}"));
                return;
            }
        };
        let stream = match session.receive_stream() {
            Ok(stream) => stream,
            Err(e) => {
                session.close().await;
                self.transition(LobbyState::Disconnected);
                self.system(&format!("Server error: {e}"));
                return;
            }
        };

        self.roster.assign(response.color, response.players);
        self.group_id = Some(response.group_id);
        self.connection = Some(Connection {
            session,
            stream: Some(stream),
        });
        self.transition(LobbyState::InLobby);
        self.system("Successfully connected");
    }

    async fn disconnect(&mut self) -> Result<(), LobbyError> {
        self.connection_mut()?;
        self.drop_connection().await;
        self.system("Disconnected from server");
        Ok(())
    }

    /// Stops the stream, closes the session and forgets server state.
    async fn drop_connection(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            if let Some(stream) = conn.stream.take() {
                conn.session.reclaim(stream).await;
            }
            conn.session.close().await;
        }
        self.roster.clear();
        self.group_id = None;
        self.transition(LobbyState::Disconnected);
    }

    fn list_players(&mut self) -> Result<(), LobbyError> {
        self.connection_mut()?;
        if let Some(group) = self.group_id.clone() {
            self.system(&format!("Group: {group}"));
        }
        let lines: Vec<String> = self
            .roster
            .snapshot()
            .iter()
            .map(|p| format!("Player: {}, Color: {}, Ready: {}", p.name, p.color, p.ready))
            .collect();
        for line in lines {
            self.system(&line);
        }
        Ok(())
    }

    fn set_name(&mut self, args: &[&str]) {
        let Some(name) = args.first() else {
            let current = format!("Your name is: {}", self.roster.me().name);
            self.system(&current);
            return;
        };
        if !(3..=30).contains(&name.chars().count()) {
            self.system("Length of name should be between 3 and 30");
            return;
        }
        self.roster.set_name(*name);
        self.system(&format!("Name has been set to: '{name}'"));
    }

    async fn ready(&mut self, args: &[&str]) -> Result<(), LobbyError> {
        self.connection_mut()?;
        let value = match args.first() {
            None => true,
            Some(arg) if arg.eq_ignore_ascii_case("false") => false,
            Some(_) => {
                self.system("Unexpected argument for /ready");
                return Ok(());
            }
        };
        self.send(&Message::Ready(Ready { value, color: None }))
            .await
    }

    /// Chat is echoed locally even when offline.
    async fn send_chat(&mut self, text: &str) {
        let me = self.roster.me().clone();
        self.push(&me.name, text);
        if self.connection.is_none() {
            return;
        }
        let msg = Message::Chat(Chat {
            message: text.to_string(),
            color: me.color,
        });
        if let Err(e) = self.send(&msg).await {
            self.report(&e);
        }
    }

    /// Sends on the open session.
    ///
    /// # Errors
    /// [`LobbyError::NotConnected`] without a session,
    /// [`LobbyError::Transport`] if the write fails.
    async fn send(&mut self, msg: &Message) -> Result<(), LobbyError> {
        self.connection_mut()?.session.send(msg).await?;
        Ok(())
    }

    /// Applies one message from the server.
    ///
    /// # Errors
    /// [`LobbyError::UnknownPlayer`] and [`LobbyError::MalformedMessage`]
    /// are informational: the lobby has already recovered when they are
    /// returned.
    pub async fn apply_remote(&mut self, msg: Message) -> Result<(), LobbyError> {
        match msg {
            Message::Chat(chat) => {
                let Some(sender) = self.roster.find(&chat.color).map(|p| p.name.clone()) else {
                    self.system(&format!("Server error: chat from unknown player {}", chat.color));
                    return Err(LobbyError::UnknownPlayer(chat.color));
                };
                self.push(&sender, &chat.message);
            }
            Message::Ready(ready) => {
                let color = ready
                    .color
                    .unwrap_or_else(|| self.roster.me().color.clone());
                let Some(player) = self.roster.find_mut(&color) else {
                    self.system(&format!("Server error: ready from unknown player {color}"));
                    return Err(LobbyError::UnknownPlayer(color));
                };
                player.ready = ready.value;
                let line = format!("{} set ready to {}", player.name, ready.value);
                self.system(&line);
            }
            Message::RosterChange(change) => return self.apply_roster_change(change),
            Message::StartGame => self.start_game().await,
            other => debug!(kind = %other.kind(), "ignoring message in lobby"),
        }
        Ok(())
    }

    fn apply_roster_change(&mut self, change: RosterChange) -> Result<(), LobbyError> {
        let player = change.player.clone();
        match change.action() {
            Some(RosterAction::Connect) => {
                self.system(&format!("Player {} ({}) connected", player.name, player.color));
                if self.roster.upsert(player) {
                    debug!(color = %change.player.color, "roster entry replaced");
                }
                Ok(())
            }
            Some(RosterAction::Disconnect) => {
                self.system(&format!("Player {} ({}) disconnected", player.name, player.color));
                self.roster.remove(&player.color).map(|_| ()).inspect_err(|e| {
                    warn!(error = %e, "disconnect for a player not in the roster");
                })
            }
            None => {
                self.system("Error: malformed message");
                Err(LobbyError::MalformedMessage(format!(
                    "unknown roster action '{}'",
                    change.action
                )))
            }
        }
    }

    async fn start_game(&mut self) {
        if let Some(conn) = self.connection.as_mut() {
            if let Some(stream) = conn.stream.take() {
                conn.session.reclaim(stream).await;
            }
        }
        self.transition(LobbyState::GameStarting);
        info!(players = self.roster.others().len() + 1, "game starting");
        self.system("Game is starting");
    }

    /// Waits for the next remote message and applies it.
    ///
    /// Returns `false` if there is nothing to read: not connected, the game
    /// is starting, or the connection was just lost.
    pub async fn pump_remote(&mut self) -> bool {
        if !self.is_streaming() {
            return false;
        }
        match recv_remote(&mut self.connection).await {
            Some(msg) => {
                if let Err(e) = self.apply_remote(msg).await {
                    debug!(error = %e, "remote message not applied");
                }
                true
            }
            None => {
                self.connection_lost().await;
                false
            }
        }
    }

    fn is_streaming(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|conn| conn.stream.is_some())
    }

    async fn connection_lost(&mut self) {
        if !self.is_streaming() {
            return;
        }
        warn!("connection to server lost");
        self.drop_connection().await;
        self.system("Connection to server lost");
    }

    /// Services user input and the server until the user exits or the game
    /// starts.
    pub async fn run(mut self, input: &mut mpsc::Receiver<String>) -> LobbyOutcome {
        info!("lobby running");
        loop {
            tokio::select! {
                line = input.recv() => {
                    let Some(line) = line else {
                        debug!("input closed");
                        self.close().await;
                        return LobbyOutcome::Exit;
                    };
                    if self.handle_line(&line).await == LineOutcome::Exit {
                        self.close().await;
                        return LobbyOutcome::Exit;
                    }
                }
                msg = recv_remote(&mut self.connection) => {
                    match msg {
                        Some(msg) => {
                            if let Err(e) = self.apply_remote(msg).await {
                                debug!(error = %e, "remote message not applied");
                            }
                        }
                        None => self.connection_lost().await,
                    }
                }
            }

            if self.state == LobbyState::GameStarting {
                if let Some(handoff) = self.into_handoff() {
                    return LobbyOutcome::GameStarting(handoff);
                }
                return LobbyOutcome::Exit;
            }
        }
    }

    /// Gives up the connection for the game phase. `None` unless the game
    /// is starting.
    pub fn into_handoff(self) -> Option<GameHandoff> {
        if self.state != LobbyState::GameStarting {
            return None;
        }
        let conn = self.connection?;
        Some(GameHandoff {
            session: conn.session,
            me: self.roster.me().clone(),
            players: self.roster.snapshot(),
            group_id: self.group_id.unwrap_or_default(),
        })
    }

    /// Closes any open connection.
    pub async fn close(&mut self) {
        if self.connection.is_some() {
            info!("closing connection");
            self.drop_connection().await;
        }
    }

    fn transition(&mut self, target: LobbyState) {
        if self.state == target {
            return;
        }
        if !self.state.can_transition_to(target) {
            warn!(from = %self.state, to = %target, "unexpected lobby transition");
        }
        debug!(from = %self.state, to = %target, "lobby state");
        self.state = target;
    }

    fn system(&mut self, text: &str) {
        self.push(SYSTEM_SENDER, text);
    }

    fn push(&mut self, sender: &str, text: &str) {
        self.history.push(sender, text);
        self.display.set_history(self.history.lines());
    }
}

/// Next message from the lobby stream. Pends forever when there is none,
/// so it can sit in a `select!` next to the input channel.
async fn recv_remote(connection: &mut Option<Connection>) -> Option<Message> {
    match connection.as_mut().and_then(|c| c.stream.as_mut()) {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

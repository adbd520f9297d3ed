//! Lobby, then game: one client session from start to finish.

use lightcycle_game::{GameConfig, GameDisplay, GameHandler, GameSummary, PlayerKey};
use lightcycle_lobby::{
    ChatDisplay, CommandTable, DisplayKind, LobbyConfig, LobbyEngine, LobbyOutcome,
};
use lightcycle_protocol::LobbyPlayer;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::LightcycleError;

/// Colors used for the two players of a local game.
pub const LOCAL_COLORS: [&str; 2] = ["#FF0000", "#00FF00"];

/// Name of the second local player.
pub const LOCAL_SECOND_NAME: &str = "Player 2";

/// Pending game keys between the input reader and the game.
const KEY_BUFFER: usize = 32;

/// Everything the client needs before it starts.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub lobby: LobbyConfig,
    pub game: GameConfig,
    /// Skip the lobby and play two players on this machine.
    pub local: bool,
}

impl ClientConfig {
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.lobby = self.lobby.with_server(host, port);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.lobby = self.lobby.with_name(name);
        self
    }

    pub fn with_grid(mut self, width: u16, height: u16) -> Self {
        self.game.width = width;
        self.game.height = height;
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }
}

/// How [`Client::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientOutcome {
    /// Left from the lobby without playing.
    Exited,
    Played(GameSummary),
}

/// Runs the lobby and then the game, reading both from one stream of input
/// lines. In the game, each whitespace-separated token of a line is a key
/// (`up`, `w`, ...) and `/exit` stops the game.
pub struct Client {
    config: ClientConfig,
    chat: DisplayKind,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            chat: DisplayKind::Headless,
        }
    }

    pub fn with_chat_display(mut self, display: Box<dyn ChatDisplay>) -> Self {
        self.chat = DisplayKind::Custom(display);
        self
    }

    /// # Errors
    /// Whatever ends the game abnormally, see [`GameHandler::run`].
    pub async fn run(
        self,
        lines: &mut mpsc::Receiver<String>,
        display: &mut dyn GameDisplay,
    ) -> Result<ClientOutcome, LightcycleError> {
        let handler = if self.config.local {
            let players = [
                LobbyPlayer::new(LOCAL_COLORS[0], self.config.lobby.name.clone(), true),
                LobbyPlayer::new(LOCAL_COLORS[1], LOCAL_SECOND_NAME, true),
            ];
            info!("starting local game");
            GameHandler::local(self.config.game, &players)?
        } else {
            let lobby = LobbyEngine::new(self.config.lobby, CommandTable::standard(), self.chat);
            match lobby.run(lines).await {
                LobbyOutcome::Exit => return Ok(ClientOutcome::Exited),
                LobbyOutcome::GameStarting(handoff) => {
                    info!(
                        group = %handoff.group_id,
                        players = handoff.players.len(),
                        "joining game"
                    );
                    GameHandler::networked(
                        &self.config.game,
                        handoff.session,
                        handoff.me.color,
                        &handoff.players,
                    )?
                }
            }
        };

        let summary = play(handler, lines, display).await?;
        info!(outcome = ?summary.outcome, ticks = summary.ticks, "game over");
        Ok(ClientOutcome::Played(summary))
    }
}

/// Runs `handler` while turning input lines into keys. Closed input or
/// `/exit` stops the game.
async fn play(
    handler: GameHandler,
    lines: &mut mpsc::Receiver<String>,
    display: &mut dyn GameDisplay,
) -> Result<GameSummary, LightcycleError> {
    let (key_tx, key_rx) = mpsc::channel(KEY_BUFFER);
    let (stop_tx, stop_rx) = oneshot::channel();
    let mut stop_tx = Some(stop_tx);

    let game = handler.run(key_rx, display, stop_rx);
    tokio::pin!(game);

    loop {
        tokio::select! {
            summary = &mut game => return Ok(summary?),

            line = lines.recv(), if stop_tx.is_some() => match line {
                Some(line) if line.trim() != "/exit" => {
                    for token in line.split_whitespace() {
                        match PlayerKey::parse(token) {
                            Some(key) => {
                                if key_tx.try_send(key).is_err() {
                                    debug!(?key, "key buffer full");
                                }
                            }
                            None => debug!(token, "not a game key"),
                        }
                    }
                }
                _ => {
                    if let Some(stop) = stop_tx.take() {
                        let _ = stop.send(());
                    }
                }
            },
        }
    }
}

//! Networked games against the stub server over loopback TCP.

use std::time::Duration;

use lightcycle_game::{
    GameConfig, GameError, GameHandler, GameSummary, HeadlessGame, Outcome, PlayerKey,
};
use lightcycle_protocol::{
    Direction, GameChange, LobbyPlayer, Message, PlayerColor, PlayerEvent, Tick,
};
use lightcycle_transport::{
    DEFAULT_CONNECT_TIMEOUT, HandshakeRequest, Session, StubPeer, StubServer,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type GameTask = JoinHandle<(Result<GameSummary, GameError>, HeadlessGame)>;

struct Running {
    peer: StubPeer,
    keys: mpsc::Sender<PlayerKey>,
    stop: oneshot::Sender<()>,
    task: GameTask,
}

fn red() -> PlayerColor {
    PlayerColor::new("#FF0000")
}

async fn handshaken(others: Vec<LobbyPlayer>) -> (Session, Vec<LobbyPlayer>, StubPeer) {
    let stub = StubServer::bind(red(), others).await.unwrap();
    let port = stub.port();
    let accept = tokio::spawn(async move { stub.accept().await.unwrap() });

    let mut session = Session::connect("127.0.0.1", port, DEFAULT_CONNECT_TIMEOUT)
        .await
        .unwrap();
    let response = session
        .handshake(&HandshakeRequest::new("Buddy"))
        .await
        .unwrap();
    let mut players = vec![LobbyPlayer::new(response.color, "Buddy", true)];
    players.extend(response.players);
    (session, players, accept.await.unwrap())
}

/// Starts a networked game for `#FF0000` with `others` in the roster.
async fn start(others: Vec<LobbyPlayer>) -> Running {
    let (session, players, peer) = handshaken(others).await;
    let handler = GameHandler::networked(&GameConfig::default(), session, red(), &players).unwrap();

    let (keys, key_rx) = mpsc::channel(16);
    let (stop, stop_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut display = HeadlessGame::default();
        let result = handler.run(key_rx, &mut display, stop_rx).await;
        (result, display)
    });
    Running {
        peer,
        keys,
        stop,
        task,
    }
}

async fn finish(task: GameTask) -> (Result<GameSummary, GameError>, HeadlessGame) {
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("game should end")
        .unwrap()
}

fn zold() -> LobbyPlayer {
    LobbyPlayer::new("#00FF00", "Zold", true)
}

fn kek() -> LobbyPlayer {
    LobbyPlayer::new("#0000FF", "Kek", true)
}

fn dead(color: &str) -> GameChange {
    GameChange {
        color: color.into(),
        direction: None,
        dead: true,
    }
}

#[tokio::test]
async fn test_networked_ticks_step_until_decided() {
    let Running {
        mut peer,
        keys: _keys,
        stop: _stop,
        task,
    } = start(vec![zold()]).await;

    peer.send(&Message::Tick(Tick {
        countdown: 3,
        ..Tick::default()
    }))
    .await
    .unwrap();
    peer.send(&Message::Tick(Tick {
        changes: vec![dead("#00FF00")],
        ..Tick::default()
    }))
    .await
    .unwrap();

    let (result, display) = finish(task).await;
    let summary = result.unwrap();
    assert_eq!(summary.outcome, Outcome::Winner(red()));
    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.winner_name.as_deref(), Some("Buddy"));
    assert_eq!(summary.timing, None);
    assert_eq!(display.frames, 2);

    // The session is closed once the game ends.
    assert_eq!(peer.recv().await.unwrap(), None);
}

#[tokio::test]
async fn test_networked_keys_become_player_events() {
    let Running {
        mut peer,
        keys,
        stop,
        task,
    } = start(vec![zold()]).await;

    keys.send(PlayerKey::Left).await.unwrap();
    // Reversal of the starting heading; never sent.
    keys.send(PlayerKey::S).await.unwrap();
    keys.send(PlayerKey::D).await.unwrap();

    assert_eq!(
        peer.recv().await.unwrap(),
        Some(Message::PlayerEvent(PlayerEvent {
            color: red(),
            direction: Direction::Left
        }))
    );
    assert_eq!(
        peer.recv().await.unwrap(),
        Some(Message::PlayerEvent(PlayerEvent {
            color: red(),
            direction: Direction::Right
        }))
    );

    stop.send(()).unwrap();
    let (result, _) = finish(task).await;
    let summary = result.unwrap();
    assert_eq!(summary.outcome, Outcome::Running);
    assert_eq!(summary.ticks, 0);
}

#[tokio::test]
async fn test_networked_dead_player_alive_on_server_is_error() {
    let Running {
        mut peer,
        keys: _keys,
        stop: _stop,
        task,
    } = start(vec![zold(), kek()]).await;

    peer.send(&Message::Tick(Tick {
        changes: vec![dead("#0000FF")],
        ..Tick::default()
    }))
    .await
    .unwrap();
    peer.send(&Message::Tick(Tick {
        changes: vec![GameChange {
            color: "#0000FF".into(),
            direction: None,
            dead: false,
        }],
        ..Tick::default()
    }))
    .await
    .unwrap();

    let (result, display) = finish(task).await;
    let err = result.unwrap_err();
    assert!(matches!(err, GameError::AliveMismatch { color } if color.as_str() == "#0000FF"));
    assert_eq!(display.frames, 1);
}

#[tokio::test]
async fn test_networked_last_tick_with_two_alive_is_error() {
    let Running {
        mut peer,
        keys: _keys,
        stop: _stop,
        task,
    } = start(vec![zold()]).await;

    peer.send(&Message::Tick(Tick {
        last_tick: true,
        ..Tick::default()
    }))
    .await
    .unwrap();

    let (result, _) = finish(task).await;
    assert!(matches!(result, Err(GameError::TooManyAlive(2))));
}

#[tokio::test]
async fn test_networked_stream_end_returns_summary() {
    let Running {
        mut peer,
        keys: _keys,
        stop: _stop,
        task,
    } = start(vec![zold()]).await;

    // Non-tick messages are ignored.
    peer.send(&Message::StartGame).await.unwrap();
    peer.close().await;

    let (result, display) = finish(task).await;
    let summary = result.unwrap();
    assert_eq!(summary.outcome, Outcome::Running);
    assert_eq!(display.frames, 0);
    assert_eq!(display.blocks.len(), 2);
}

#[tokio::test]
async fn test_networked_requires_local_player_in_roster() {
    let (session, _, _peer) = handshaken(vec![zold()]).await;
    let err = GameHandler::networked(
        &GameConfig::default(),
        session,
        red(),
        &[zold()],
    )
    .unwrap_err();
    assert!(matches!(err, GameError::UnknownPlayer(c) if c == red()));
}

//! Local two-player games on a paused clock.
//!
//! With no keys pressed on the default 40×20 grid, player 0 starts at
//! (13, 10) heading up and player 1 at (26, 10) heading down. Player 1
//! hits the bottom wall on tick 10 while player 0 still moves, so player 0
//! wins on tick 10.

use std::time::Duration;

use lightcycle_game::{
    GameConfig, GameHandler, GameSummary, HeadlessGame, Outcome, PlayerKey, Position,
};
use lightcycle_protocol::{LobbyPlayer, PlayerColor};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

fn roster() -> Vec<LobbyPlayer> {
    vec![
        LobbyPlayer::new("#FF0000", "Buddy", true),
        LobbyPlayer::new("#00FF00", "Zold", true),
    ]
}

/// Runs a local game with `keys` queued before the first tick.
async fn play(
    config: GameConfig,
    keys: &[PlayerKey],
    stop_after: Option<Duration>,
) -> (GameSummary, HeadlessGame) {
    let handler = GameHandler::local(config, &roster()).expect("two players");
    let (key_tx, key_rx) = mpsc::channel(16);
    for &key in keys {
        key_tx.send(key).await.unwrap();
    }
    let (stop_tx, stop_rx) = oneshot::channel();
    let stopper = tokio::spawn(async move {
        match stop_after {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                let _ = stop_tx.send(());
            }
            // Keep the sender alive until the game is over.
            None => std::future::pending::<()>().await,
        }
    });

    let mut display = HeadlessGame::default();
    let summary = handler.run(key_rx, &mut display, stop_rx).await.unwrap();
    stopper.abort();
    drop(key_tx);
    (summary, display)
}

fn red() -> PlayerColor {
    PlayerColor::new("#FF0000")
}

#[tokio::test(start_paused = true)]
async fn test_local_game_without_input_ends_at_wall() {
    let start = Instant::now();
    let (summary, display) = play(GameConfig::default(), &[], None).await;

    assert_eq!(summary.outcome, Outcome::Winner(red()));
    assert_eq!(summary.ticks, 10);
    assert_eq!(summary.winner_name.as_deref(), Some("Buddy"));
    assert!(start.elapsed() >= Duration::from_millis(4500));

    let timing = summary.timing.expect("local games report tick timing");
    assert_eq!(timing.ticks, 10);
    assert_eq!(timing.late_ticks, 0);

    assert_eq!(display.frames, 10);
    // Two starting cells, ten moves by the winner, nine by the loser.
    assert_eq!(display.blocks.len(), 21);
    assert_eq!(display.outcome, Some(Outcome::Winner(red())));
}

#[tokio::test(start_paused = true)]
async fn test_local_keys_steer_matching_player() {
    let (_, display) = play(GameConfig::default(), &[PlayerKey::Right, PlayerKey::A], None).await;

    // Tick 1 appends player 0 then player 1.
    assert_eq!(display.blocks[2].position, Position::new(14, 10));
    assert_eq!(display.blocks[3].position, Position::new(25, 10));
}

#[tokio::test(start_paused = true)]
async fn test_local_one_turn_per_tick_and_reversal_ignored() {
    let (_, display) = play(GameConfig::default(), &[PlayerKey::Down, PlayerKey::Left], None).await;

    // Tick 1 takes the reversal and ignores it; tick 2 takes the left turn.
    assert_eq!(display.blocks[2].position, Position::new(13, 9));
    assert_eq!(display.blocks[4].position, Position::new(12, 9));
}

#[tokio::test(start_paused = true)]
async fn test_local_full_queue_drops_new_keys() {
    let config = GameConfig {
        queue_capacity: 1,
        ..GameConfig::default()
    };
    let (_, display) = play(config, &[PlayerKey::D, PlayerKey::S], None).await;

    // The down turn never made it into player 1's queue.
    assert_eq!(display.blocks[3].position, Position::new(27, 10));
    assert_eq!(display.blocks[5].position, Position::new(28, 10));
}

#[tokio::test(start_paused = true)]
async fn test_local_stop_ends_between_ticks() {
    let (summary, display) =
        play(GameConfig::default(), &[], Some(Duration::from_millis(1000))).await;

    assert_eq!(summary.outcome, Outcome::Running);
    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.winner_name, None);
    assert_eq!(display.outcome, None);
}

//! Terminal entry point: stdin lines drive the lobby and the game, chat and
//! board deltas go to stdout, logs go to a file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use lightcycle::{Client, ClientConfig, ClientOutcome, LightcycleError, TextBoard, TextChat};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server used by a bare `/connect`
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port used by a bare `/connect`
    #[arg(short, long, default_value = "8765")]
    port: u16,

    /// Player name until `/setname`
    #[arg(short, long, default_value = "Buddy")]
    name: String,

    /// Skip the lobby and play two players on this keyboard
    #[arg(long)]
    local: bool,

    /// Grid width
    #[arg(long, default_value = "40")]
    width: u16,

    /// Grid height
    #[arg(long, default_value = "20")]
    height: u16,

    /// Where logs are written
    #[arg(long, default_value = "lightcycle.log")]
    log_file: PathBuf,
}

fn init_logging(path: &Path) -> Result<(), LightcycleError> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), LightcycleError> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let config = ClientConfig::default()
        .with_server(args.host, args.port)
        .with_name(args.name)
        .with_grid(args.width, args.height)
        .local(args.local);
    info!(local = config.local, "starting client");

    let (line_tx, mut lines) = mpsc::channel(64);
    // Blocking stdin reads stay off the runtime.
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "could not read stdin");
                    break;
                }
            }
        }
    });

    if config.local {
        println!("Player 1 steers with up/down/left/right, player 2 with w/a/s/d. /exit quits.");
    }
    let client = Client::new(config).with_chat_display(Box::new(TextChat::new(std::io::stdout())));
    let mut board = TextBoard::new(std::io::stdout());
    match client.run(&mut lines, &mut board).await? {
        ClientOutcome::Exited => info!("exited from lobby"),
        ClientOutcome::Played(summary) => {
            info!(ticks = summary.ticks, winner = ?summary.winner_name, "finished");
        }
    }
    Ok(())
}

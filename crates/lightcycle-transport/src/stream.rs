//! The background receive loop and the stream it feeds.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use lightcycle_protocol::{Codec, JsonCodec, Message};
use tokio::io::{BufReader, Split};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::ConnectionId;

/// Newline-delimited segments of the read half. Segments are raw bytes so a
/// line that is not UTF-8 is only a decode error, never a read error.
pub(crate) type LineReader = Split<BufReader<OwnedReadHalf>>;

/// Drops a trailing `\r`. `None` for a line with nothing but whitespace.
pub(crate) fn trim_line(line: &[u8]) -> Option<&[u8]> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(line)
    }
}

/// Decoded messages from one connection, produced by a dedicated task.
///
/// The sequence is lazy, unbounded and non-restartable. It ends (yields
/// `None`) when the peer closes the connection or a read fails. Lines that
/// fail to decode are logged and skipped.
///
/// Dropping the stream stops the task. To stop it *and* keep the
/// connection usable, hand it to [`Session::reclaim`](crate::Session::reclaim).
pub struct MessageStream {
    id: ConnectionId,
    rx: mpsc::UnboundedReceiver<Message>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Option<LineReader>>,
}

impl MessageStream {
    pub(crate) fn spawn(
        id: ConnectionId,
        reader: LineReader,
        codec: JsonCodec,
        pending: impl IntoIterator<Item = Message>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for msg in pending {
            // The receiver is alive right here.
            let _ = tx.send(msg);
        }
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(receive_loop(id, reader, codec, tx, stop_rx));
        Self {
            id,
            rx,
            stop: Some(stop_tx),
            task,
        }
    }

    /// Waits for the next message. `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// The connection this stream reads from.
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    /// Stops the task and returns the read half (if the connection is still
    /// readable) plus any messages that were decoded but not yet consumed.
    pub(crate) async fn shutdown(mut self) -> (Option<LineReader>, Vec<Message>) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let reader = match self.task.await {
            Ok(reader) => reader,
            Err(e) => {
                warn!(conn = %self.id, error = %e, "receive task failed");
                None
            }
        };
        let mut leftover = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            leftover.push(msg);
        }
        if !leftover.is_empty() {
            debug!(conn = %self.id, count = leftover.len(), "kept unread messages");
        }
        (reader, leftover)
    }
}

impl Stream for MessageStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.rx.poll_recv(cx)
    }
}

/// Reads lines until stopped, EOF or a read error.
///
/// Returns the reader when stopped so the connection can be read again.
/// `next_segment` is cancel-safe, so racing it against the stop signal
/// never loses a partially read line.
async fn receive_loop(
    id: ConnectionId,
    mut reader: LineReader,
    codec: JsonCodec,
    tx: mpsc::UnboundedSender<Message>,
    mut stop: oneshot::Receiver<()>,
) -> Option<LineReader> {
    debug!(conn = %id, "receive loop started");
    loop {
        let line = tokio::select! {
            biased;
            _ = &mut stop => {
                debug!(conn = %id, "receive loop stopped");
                return Some(reader);
            }
            line = reader.next_segment() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!(conn = %id, "connection closed by peer");
                return None;
            }
            Err(e) => {
                warn!(conn = %id, error = %e, "read failed, ending receive loop");
                return None;
            }
        };

        let Some(line) = trim_line(&line) else {
            continue;
        };

        match codec.decode(line) {
            Ok(msg) => {
                trace!(conn = %id, kind = %msg.kind(), "message received");
                if tx.send(msg).is_err() {
                    debug!(conn = %id, "stream dropped, ending receive loop");
                    return Some(reader);
                }
            }
            Err(e) => {
                let line = String::from_utf8_lossy(line);
                warn!(conn = %id, error = %e, %line, "dropping undecodable line");
            }
        }
    }
}

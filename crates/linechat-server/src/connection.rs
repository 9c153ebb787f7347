//! Reader and writer tasks for one connection
//!
//! Each accepted socket is split into a reader task (decodes lines into the
//! session's inbox, intercepting pong responses) and a writer task (drains
//! the session's outbox back onto the wire). The worker in between never
//! touches the socket, so slow command handling cannot stall reads and a
//! stalled peer cannot stall the worker.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use linechat_core::protocol::tokens;
use linechat_core::SessionId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::liveness::PingTracker;
use crate::server::Shared;
use crate::session::SessionHandle;
use crate::worker::SessionWorker;

/// Drive one connection to completion: spawn the reader and writer, run the
/// session worker inline, then tear both halves down.
pub async fn handle(stream: TcpStream, addr: SocketAddr, id: SessionId, shared: Arc<Shared>) {
    debug!(%id, %addr, "connection accepted");
    let (read_half, write_half) = stream.into_split();

    let (handle, outbox_rx) = SessionHandle::new(id, addr);
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let name = Arc::new(OnceLock::new());

    let reader = tokio::spawn(run_reader(
        read_half,
        inbox_tx,
        Arc::clone(&shared.tracker),
        Arc::clone(&name),
    ));
    let writer = tokio::spawn(run_writer(write_half, outbox_rx));

    let worker = SessionWorker::new(
        handle,
        inbox_rx,
        name,
        Arc::clone(&shared.registry),
        shared.router(),
        Arc::clone(&shared.tracker),
        shared.timing.clone(),
    );
    worker.run().await;

    // The worker has unregistered; dropping its outbox sender above lets
    // the writer flush anything still queued (the quit acknowledgment) and
    // exit. The reader may be blocked on a peer that never closes, so it
    // is stopped explicitly.
    reader.abort();
    let _ = writer.await;
    debug!(%id, %addr, "connection closed");
}

/// Read lines off the socket into the inbox. `PING` responses never enter
/// the inbox; they are recorded against the current heartbeat round under
/// the session's registered name.
async fn run_reader(
    read_half: OwnedReadHalf,
    inbox: mpsc::UnboundedSender<String>,
    tracker: Arc<PingTracker>,
    name: Arc<OnceLock<String>>,
) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line == tokens::PING {
                    if let Some(name) = name.get() {
                        trace!(name = name.as_str(), "pong received");
                        tracker.record_pong(name);
                    }
                } else if inbox.send(line).is_err() {
                    break;
                }
            }
            Ok(None) | Err(_) => break,
        }
    }
    // Dropping the inbox sender wakes the worker with end-of-input.
}

/// Drain the outbox onto the socket, one line per message.
async fn run_writer(write_half: OwnedWriteHalf, mut outbox: mpsc::UnboundedReceiver<String>) {
    let mut writer = BufWriter::new(write_half);
    while let Some(line) = outbox.recv().await {
        if writer.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if writer.write_all(b"\n").await.is_err() {
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }
    // Exiting drops the receiver; pending sends fail and the registry
    // treats the session as disconnected.
}

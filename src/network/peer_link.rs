//! Peer link manager: one healthy stream per peer in a symmetric mesh.
//!
//! Every stream, dialed or accepted, starts with an `intro` handshake: send
//! our identity line, read theirs. Duplicate streams for the same remote
//! identity are resolved by the tie-break in [`PeerRegistry::register`].
//!
//! All peer-networking failures stay inside this module. A lost stream is
//! unregistered and reported to the coordinator as a peer-offline event; it
//! never stops the car controller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

use crate::config;
use crate::network::coordinator::CoordEvent;
use crate::network::messages::PeerMessage;
use crate::print;

/// Why a connection task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnOutcome {
    /// The stream errored or the remote closed it. Dialers reconnect.
    Closed,
    /// A newer stream for the same remote identity took over.
    Replaced,
    /// The handshake lost the tie-break against an existing stream.
    Duplicate,
}

struct PeerHandle {
    token: u64,
    line_tx: mpsc::Sender<String>,
}

/// Live peer connections, keyed by remote identity.
///
/// Each registered handle carries a token so a replaced connection can never
/// unregister its successor or report it offline.
pub struct PeerRegistry {
    inner: Mutex<HashMap<u8, PeerHandle>>,
    next_token: AtomicU64,
}

impl PeerRegistry {
    /// An empty registry.
    pub fn new() -> Arc<PeerRegistry> {
        Arc::new(PeerRegistry {
            inner: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        })
    }

    /// Registers a freshly handshaken stream for `remote_id`.
    ///
    /// Tie-break when a stream for that identity already exists: the new
    /// stream wins only if `remote_id` is numerically smaller than our own
    /// identity, in which case the old handle is dropped and its connection
    /// task sees a closed outbox. Otherwise the new stream is rejected.
    ///
    /// Returns the token guarding the new entry, or `None` if rejected.
    pub async fn register(
        &self,
        remote_id: u8,
        self_id: u8,
        line_tx: mpsc::Sender<String>,
    ) -> Option<u64> {
        let mut map = self.inner.lock().await;
        if map.contains_key(&remote_id) && remote_id >= self_id {
            return None;
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        map.insert(remote_id, PeerHandle { token, line_tx });
        Some(token)
    }

    /// Removes the entry for `remote_id` if it still carries `token`.
    /// Returns whether anything was removed.
    pub async fn unregister(&self, remote_id: u8, token: u64) -> bool {
        let mut map = self.inner.lock().await;
        match map.get(&remote_id) {
            Some(handle) if handle.token == token => {
                map.remove(&remote_id);
                true
            }
            _ => false,
        }
    }

    /// Identities of all currently connected peers.
    pub async fn connected_ids(&self) -> Vec<u8> {
        self.inner.lock().await.keys().copied().collect()
    }

    /// Best-effort fan-out of one message to every live connection.
    ///
    /// A full or closed outbox on one connection skips that peer; its own
    /// read loop will notice a real failure and clean up.
    pub async fn broadcast(&self, msg: &PeerMessage) {
        let line = match msg.to_line() {
            Ok(line) => line,
            Err(e) => {
                print::err(format!("Failed to serialize peer message: {}", e));
                return;
            }
        };
        let map = self.inner.lock().await;
        for handle in map.values() {
            let _ = handle.line_tx.try_send(line.clone());
        }
    }
}

/// Accepts inbound peer streams forever.
pub async fn listen(
    listen_port: u16,
    self_id: u8,
    registry: Arc<PeerRegistry>,
    coord_tx: mpsc::Sender<CoordEvent>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", listen_port)).await?;
    print::ok(format!("Listening for peers on port {}", listen_port));

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                print::peer(format!("Inbound peer stream from {}", addr));
                let registry = registry.clone();
                let coord_tx = coord_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = run_connection(stream, self_id, registry, coord_tx).await {
                        print::warn(format!("Peer stream from {} failed: {}", addr, e));
                    }
                });
            }
            Err(e) => {
                print::warn(format!("Accept failed: {}", e));
                sleep(config::DIAL_RETRY_PERIOD).await;
            }
        }
    }
}

/// Dials one configured peer, retrying forever on failure.
///
/// Distinct backoffs for "dial failed" and "stream closed after success".
/// Stops only when a handshake loses the tie-break or the stream is replaced
/// by a newer one, since a live stream for that peer then already exists or
/// the remote is dialing us.
pub async fn dial(
    addr: String,
    self_id: u8,
    registry: Arc<PeerRegistry>,
    coord_tx: mpsc::Sender<CoordEvent>,
) {
    loop {
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                print::peer(format!("Dialed peer at {}", addr));
                match run_connection(stream, self_id, registry.clone(), coord_tx.clone()).await {
                    Ok(ConnOutcome::Closed) => {
                        print::warn(format!("Peer stream to {} closed, reconnecting", addr));
                        sleep(config::RECONNECT_PERIOD).await;
                    }
                    Ok(ConnOutcome::Replaced) | Ok(ConnOutcome::Duplicate) => return,
                    Err(e) => {
                        print::warn(format!("Peer stream to {} failed: {}", addr, e));
                        sleep(config::RECONNECT_PERIOD).await;
                    }
                }
            }
            Err(_) => sleep(config::DIAL_RETRY_PERIOD).await,
        }
    }
}

/// Handshakes and services one peer stream until it ends.
///
/// After the `intro` exchange the task forwards every parsed inbound line to
/// the coordinator and writes every queued outbound line, until the stream
/// closes, errors, or a newer stream takes over the registry entry.
pub async fn run_connection(
    stream: TcpStream,
    self_id: u8,
    registry: Arc<PeerRegistry>,
    coord_tx: mpsc::Sender<CoordEvent>,
) -> anyhow::Result<ConnOutcome> {
    let (reader, mut writer) = stream.into_split();

    let intro = PeerMessage::Intro { id: self_id }.to_line()?;
    writer.write_all(intro.as_bytes()).await?;

    let mut lines = BufReader::new(reader).lines();
    let Some(first) = lines.next_line().await? else {
        return Ok(ConnOutcome::Closed);
    };
    let Some(PeerMessage::Intro { id: remote_id }) = PeerMessage::from_line(&first) else {
        print::warn(format!("Peer sent no intro, dropping stream: {}", first));
        return Ok(ConnOutcome::Closed);
    };

    let (line_tx, mut line_rx) = mpsc::channel::<String>(config::PEER_LINE_CAPACITY);
    let Some(token) = registry.register(remote_id, self_id, line_tx).await else {
        print::peer(format!("Duplicate stream for peer {} rejected", remote_id));
        return Ok(ConnOutcome::Duplicate);
    };
    print::ok(format!("Peer {} connected", remote_id));

    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(msg) = PeerMessage::from_line(&line) {
                        let _ = coord_tx
                            .send(CoordEvent::FromPeer { id: remote_id, msg })
                            .await;
                    }
                }
                Ok(None) => break ConnOutcome::Closed,
                Err(e) => {
                    print::warn(format!("Read from peer {} failed: {}", remote_id, e));
                    break ConnOutcome::Closed;
                }
            },
            out = line_rx.recv() => match out {
                Some(line) => {
                    if writer.write_all(line.as_bytes()).await.is_err() {
                        break ConnOutcome::Closed;
                    }
                }
                // Registry handle dropped: a newer stream took over
                None => break ConnOutcome::Replaced,
            },
        }
    };

    if outcome == ConnOutcome::Closed && registry.unregister(remote_id, token).await {
        print::warn(format!("Peer {} disconnected", remote_id));
        let _ = coord_tx.send(CoordEvent::PeerOffline { id: remote_id }).await;
    }
    Ok(outcome)
}

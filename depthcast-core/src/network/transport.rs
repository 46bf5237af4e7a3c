//! Transport abstraction and its TCP implementation.
//!
//! The controller and receiver only see [`Transport`]: a reliable,
//! ordered, framed link that notifies connects/disconnects, can send to
//! one connection or broadcast, and routes inbound packets to the
//! handler registered for their tag.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::message::PacketTag;
use crate::network::connection::Connection;
use crate::packet::peek_tag;

pub type ConnectionId = u64;

/// Queue depth for each registered tag handler.
const HANDLER_QUEUE: usize = 64;

/// Queue depth for connection event subscribers.
const EVENT_QUEUE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected(ConnectionId),
    Disconnected(ConnectionId),
}

/// A packet routed to a tag handler, still encoded.
#[derive(Debug, Clone)]
pub struct InboundPacket {
    pub connection: ConnectionId,
    pub tag: PacketTag,
    pub bytes: Bytes,
}

// ── Transport ────────────────────────────────────────────────────

#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether at least one connection is open.
    fn is_connected(&self) -> bool;

    /// Send to every open connection.
    async fn broadcast(&self, packet: Bytes) -> Result<(), TransportError>;

    /// Send to one connection.
    async fn send_to(&self, connection: ConnectionId, packet: Bytes)
    -> Result<(), TransportError>;

    /// Route every inbound packet carrying `tag` to the returned receiver.
    /// A second registration for the same tag replaces the first.
    fn register_handler(&self, tag: PacketTag) -> mpsc::Receiver<InboundPacket>;

    /// Receive connect/disconnect notifications.
    fn subscribe_connections(&self) -> mpsc::Receiver<ConnectionEvent>;
}

// ── Dispatcher ───────────────────────────────────────────────────

/// Tag-keyed routing table plus connection-event fan-out.
///
/// Shared by every transport implementation (including test doubles).
#[derive(Debug, Default)]
pub struct Dispatcher {
    handlers: Mutex<HashMap<PacketTag, mpsc::Sender<InboundPacket>>>,
    listeners: Mutex<Vec<mpsc::Sender<ConnectionEvent>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tag: PacketTag) -> mpsc::Receiver<InboundPacket> {
        let (tx, rx) = mpsc::channel(HANDLER_QUEUE);
        lock(&self.handlers).insert(tag, tx);
        rx
    }

    pub fn subscribe(&self) -> mpsc::Receiver<ConnectionEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        lock(&self.listeners).push(tx);
        rx
    }

    /// Route one framed packet to its handler.
    ///
    /// Unknown or unregistered tags are logged and dropped.
    pub async fn dispatch(&self, connection: ConnectionId, bytes: Bytes) {
        let tag = match peek_tag(&bytes) {
            Ok(tag) => tag,
            Err(e) => {
                warn!(connection, "dropping packet: {e}");
                return;
            }
        };

        let handler = lock(&self.handlers).get(&tag).cloned();
        match handler {
            Some(tx) => {
                let inbound = InboundPacket {
                    connection,
                    tag,
                    bytes,
                };
                if tx.send(inbound).await.is_err() {
                    debug!(connection, %tag, "handler gone, dropping packet");
                }
            }
            None => debug!(connection, %tag, "no handler registered, dropping packet"),
        }
    }

    pub async fn notify(&self, event: ConnectionEvent) {
        let listeners: Vec<_> = lock(&self.listeners).clone();
        for tx in listeners {
            let _ = tx.send(event).await;
        }
        lock(&self.listeners).retain(|tx| !tx.is_closed());
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── TcpTransport ─────────────────────────────────────────────────

pub(crate) struct Shared {
    peers: Mutex<HashMap<ConnectionId, Connection>>,
    pub(crate) dispatcher: Dispatcher,
    next_id: AtomicU64,
}

impl Shared {
    /// Called by a connection's reader task when the peer goes away.
    pub(crate) async fn on_closed(&self, id: ConnectionId) {
        if lock(&self.peers).remove(&id).is_some() {
            info!(connection = id, "connection closed");
            self.dispatcher
                .notify(ConnectionEvent::Disconnected(id))
                .await;
        }
    }
}

/// [`Transport`] over TCP with length-prefixed framing.
///
/// Cloning yields another handle to the same set of connections.
#[derive(Clone)]
pub struct TcpTransport {
    shared: Arc<Shared>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                peers: Mutex::new(HashMap::new()),
                dispatcher: Dispatcher::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Bind `addr` and accept connections in a background task.
    ///
    /// Returns the bound address (useful with port 0) and the accept
    /// loop's handle; abort the handle to stop accepting.
    pub async fn listen(
        &self,
        addr: impl ToSocketAddrs,
    ) -> Result<(SocketAddr, JoinHandle<()>), TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        info!("listening on {local}");

        let this = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let id = this.attach(stream).await;
                        info!(connection = id, "accepted {peer}");
                    }
                    Err(e) => warn!("accept error: {e}"),
                }
            }
        });
        Ok((local, handle))
    }

    /// Open a client connection.
    pub async fn connect(&self, addr: impl ToSocketAddrs) -> Result<ConnectionId, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        let peer = stream.peer_addr()?;
        let id = self.attach(stream).await;
        info!(connection = id, "connected to {peer}");
        Ok(id)
    }

    /// Adopt an established stream as a new connection.
    pub async fn attach(&self, stream: TcpStream) -> ConnectionId {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {e}");
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        {
            // Insert under the lock so a reader that closes immediately
            // cannot run `on_closed` before the peer is registered.
            let mut peers = lock(&self.shared.peers);
            let conn = Connection::spawn(id, stream, Arc::clone(&self.shared));
            peers.insert(id, conn);
        }
        self.shared
            .dispatcher
            .notify(ConnectionEvent::Connected(id))
            .await;
        id
    }

    /// Drop a connection; its tasks wind down and a `Disconnected`
    /// event is emitted.
    pub async fn close(&self, id: ConnectionId) {
        let removed = lock(&self.shared.peers).remove(&id);
        if let Some(conn) = removed {
            conn.shutdown();
            self.shared
                .dispatcher
                .notify(ConnectionEvent::Disconnected(id))
                .await;
        }
    }

    pub fn connection_count(&self) -> usize {
        lock(&self.shared.peers).len()
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn is_connected(&self) -> bool {
        !lock(&self.shared.peers).is_empty()
    }

    async fn broadcast(&self, packet: Bytes) -> Result<(), TransportError> {
        let peers: Vec<Connection> = lock(&self.shared.peers).values().cloned().collect();
        if peers.is_empty() {
            return Err(TransportError::NotConnected);
        }
        for conn in peers {
            if let Err(e) = conn.send(packet.clone()).await {
                debug!(connection = conn.id(), "broadcast skipped: {e}");
            }
        }
        Ok(())
    }

    async fn send_to(
        &self,
        connection: ConnectionId,
        packet: Bytes,
    ) -> Result<(), TransportError> {
        let conn = lock(&self.shared.peers).get(&connection).cloned();
        match conn {
            Some(conn) => conn.send(packet).await,
            None => Err(TransportError::ConnectionClosed(connection)),
        }
    }

    fn register_handler(&self, tag: PacketTag) -> mpsc::Receiver<InboundPacket> {
        self.shared.dispatcher.register(tag)
    }

    fn subscribe_connections(&self) -> mpsc::Receiver<ConnectionEvent> {
        self.shared.dispatcher.subscribe()
    }
}

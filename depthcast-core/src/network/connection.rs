use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_util::codec::Framed;
use tracing::warn;

use crate::codec::DepthCodec;
use crate::error::TransportError;
use crate::network::transport::{ConnectionId, Shared};

/// Outbound packets buffered per connection before `send` waits.
const OUTBOUND_QUEUE: usize = 16;

/// Handle to one framed TCP connection.
///
/// Owns a background writer task (user → network) and reader task
/// (network → dispatcher). Cloning shares the same outbound queue.
#[derive(Debug, Clone)]
pub(crate) struct Connection {
    id: ConnectionId,
    tx: mpsc::Sender<Bytes>,
    reader: AbortHandle,
}

impl Connection {
    pub(crate) fn spawn(id: ConnectionId, stream: TcpStream, shared: Arc<Shared>) -> Self {
        let (mut net_writer, mut net_reader) = Framed::new(stream, DepthCodec::new()).split();

        // User -> Network
        let (tx, mut network_rx) = mpsc::channel::<Bytes>(OUTBOUND_QUEUE);

        // Writer task: ends when every sender is dropped or the socket fails.
        tokio::spawn(async move {
            while let Some(packet) = network_rx.recv().await {
                if let Err(e) = net_writer.send(packet).await {
                    warn!(connection = id, "network write error: {e}");
                    break;
                }
            }
        });

        // Reader task: Network -> Dispatcher
        let reader = tokio::spawn(async move {
            while let Some(result) = net_reader.next().await {
                match result {
                    Ok(packet) => shared.dispatcher.dispatch(id, packet).await,
                    Err(e) => {
                        warn!(connection = id, "network read error: {e}");
                        break;
                    }
                }
            }
            shared.on_closed(id).await;
        });

        Self {
            id,
            tx,
            reader: reader.abort_handle(),
        }
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) async fn send(&self, packet: Bytes) -> Result<(), TransportError> {
        self.tx
            .send(packet)
            .await
            .map_err(|_| TransportError::ConnectionClosed(self.id))
    }

    /// Stop reading. The writer drains and exits once the last handle
    /// to this connection is dropped.
    pub(crate) fn shutdown(&self) {
        self.reader.abort();
    }
}

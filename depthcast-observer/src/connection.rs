//! Client connection to a depth provider.
//!
//! Wraps a [`TcpTransport`] with an [`ObserverReceiver`] attached before
//! the socket opens, so the provider's stream descriptions (sent right
//! after connect) are never missed.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use depthcast_core::{
    ConnectionId, DepthError, FrameSize, ObserverReceiver, StreamDescription, TcpTransport,
    Transport,
};

/// Manages the TCP link to the provider.
pub struct ProviderConnection {
    transport: TcpTransport,
    receiver: Arc<ObserverReceiver>,
    connection: ConnectionId,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl ProviderConnection {
    /// Connect to `addr`, giving up after `timeout`.
    pub async fn connect(
        addr: &str,
        size: FrameSize,
        timeout: Duration,
    ) -> Result<Self, DepthError> {
        let transport = TcpTransport::new();
        let receiver = Arc::new(ObserverReceiver::new(size));
        let stop = CancellationToken::new();
        let task = receiver.spawn(&transport, stop.clone());

        info!("connecting to provider at {addr}");
        let connection = match tokio::time::timeout(timeout, transport.connect(addr)).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                stop.cancel();
                return Err(e.into());
            }
            Err(_) => {
                stop.cancel();
                return Err(timed_out("connect"));
            }
        };

        Ok(Self {
            transport,
            receiver,
            connection,
            stop,
            task,
        })
    }

    pub fn receiver(&self) -> &Arc<ObserverReceiver> {
        &self.receiver
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Wait until the provider has announced its streams.
    pub async fn wait_for_streams(
        &self,
        timeout: Duration,
    ) -> Result<Vec<StreamDescription>, DepthError> {
        let mut updates = self.receiver.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let streams = self.receiver.streams();
            if !streams.is_empty() {
                return Ok(streams);
            }
            match tokio::time::timeout_at(deadline, updates.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => return Err(DepthError::ChannelClosed),
                Err(_) => return Err(timed_out("stream descriptions")),
            }
        }
    }

    /// Ask the provider to stream frames to this observer.
    pub async fn start_capture(&self, want_intrinsics: bool) -> Result<(), DepthError> {
        ObserverReceiver::request_capture(&self.transport, true, want_intrinsics).await
    }

    pub async fn stop_capture(&self) -> Result<(), DepthError> {
        ObserverReceiver::request_capture(&self.transport, false, false).await
    }

    /// Drop the link and stop the receive task.
    pub async fn close(self) {
        self.transport.close(self.connection).await;
        self.stop.cancel();
        let _ = self.task.await;
        info!("provider connection closed");
    }
}

fn timed_out(what: &str) -> DepthError {
    DepthError::Io(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("timed out waiting for {what}"),
    ))
}

#[cfg(test)]
mod tests {
    use depthcast_core::{
        CameraType, CaptureRequest, ConnectionEvent, Packet, PacketTag, StreamResolution,
    };

    use super::*;

    const SIZE: FrameSize = FrameSize::new(4, 3);

    fn description() -> StreamDescription {
        StreamDescription::new(
            "Sensor Streaming",
            "Source#2",
            StreamResolution::new(SIZE.width, SIZE.height, 5.0),
            CameraType::Depth,
        )
    }

    /// A provider stand-in that announces one stream on connect and
    /// forwards every capture request it receives.
    async fn fake_provider() -> (
        std::net::SocketAddr,
        tokio::sync::mpsc::UnboundedReceiver<CaptureRequest>,
    ) {
        let transport = TcpTransport::new();
        let mut events = transport.subscribe_connections();
        let mut requests = transport.register_handler(PacketTag::DepthCapture);
        let (addr, _accept) = transport.listen("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = events.recv() => {
                        if let ConnectionEvent::Connected(id) = event {
                            let bytes = Packet::StreamDescriptions(vec![description()]).encode();
                            transport.send_to(id, bytes).await.unwrap();
                        }
                    }
                    Some(inbound) = requests.recv() => {
                        if let Ok(Packet::DepthCapture(req)) = Packet::decode(&inbound.bytes) {
                            let _ = tx.send(req);
                        }
                    }
                    else => break,
                }
            }
        });
        (addr, rx)
    }

    #[tokio::test]
    async fn connect_receives_streams_and_sends_requests() {
        let (addr, mut requests) = fake_provider().await;
        let conn = ProviderConnection::connect(&addr.to_string(), SIZE, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(conn.is_connected());

        let streams = conn.wait_for_streams(Duration::from_secs(5)).await.unwrap();
        assert_eq!(streams, vec![description()]);

        conn.start_capture(true).await.unwrap();
        assert_eq!(requests.recv().await.unwrap(), CaptureRequest::new(true, true));
        conn.stop_capture().await.unwrap();
        assert_eq!(requests.recv().await.unwrap(), CaptureRequest::new(false, false));

        conn.close().await;
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result =
            ProviderConnection::connect(&addr.to_string(), SIZE, Duration::from_secs(5)).await;
        assert!(result.is_err());
    }
}

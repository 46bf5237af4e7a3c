//! Provider service: wires the device, transport and controller.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;

use depthcast_core::{CaptureController, DepthDevice, DepthError, TcpTransport, Transport};

use crate::config::ProviderConfig;
use crate::synthetic::SyntheticDevice;

// ── ProviderService ──────────────────────────────────────────────

pub struct ProviderService {
    config: ProviderConfig,
    device: Arc<dyn DepthDevice>,
    shutdown: CancellationToken,
}

impl ProviderService {
    /// Service backed by the synthetic device.
    pub fn new(config: ProviderConfig) -> Self {
        let device = Arc::new(SyntheticDevice::new(config.to_device_config()));
        Self::with_device(config, device)
    }

    pub fn with_device(config: ProviderConfig, device: Arc<dyn DepthDevice>) -> Self {
        Self {
            config,
            device,
            shutdown: CancellationToken::new(),
        }
    }

    /// A token that stops [`run`](Self::run) when cancelled.
    pub fn stop_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Listen and serve until stopped.
    ///
    /// `bound` receives the listening address once the socket is open.
    pub async fn run(&self, bound: Option<oneshot::Sender<SocketAddr>>) -> Result<(), DepthError> {
        let transport = TcpTransport::new();
        let controller = CaptureController::new(
            Arc::clone(&self.device),
            Arc::new(transport.clone()) as Arc<dyn Transport>,
            self.config.to_controller_config(),
        );

        let (addr, accept) = transport
            .listen(self.config.network.listen_address.as_str())
            .await?;
        info!("depth provider listening on {addr}");
        if let Some(tx) = bound {
            let _ = tx.send(addr);
        }

        let result = controller.run(self.shutdown.clone()).await;
        accept.abort();
        info!("depth provider stopped");
        result
    }
}

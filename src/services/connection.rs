use crate::{config::mask_url, error::Result};
use alloy::{
    providers::{ProviderBuilder, RootProvider},
    transports::BoxTransport,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One lazily established connection to the chain endpoint, shared by the
/// event source, balance reads and freeze writes.
///
/// A failed connect leaves the slot empty, so the next caller retries.
pub struct ChainConnection {
    rpc_url: String,
    provider: RwLock<Option<RootProvider<BoxTransport>>>,
}

impl ChainConnection {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc_url,
            provider: RwLock::new(None),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn uses_pubsub(&self) -> bool {
        self.rpc_url.starts_with("ws://") || self.rpc_url.starts_with("wss://")
    }

    /// Returns the live provider, connecting first if there is none.
    pub async fn provider(&self) -> Result<RootProvider<BoxTransport>> {
        if let Some(provider) = self.provider.read().await.as_ref() {
            return Ok(provider.clone());
        }

        let mut slot = self.provider.write().await;
        if let Some(provider) = slot.as_ref() {
            return Ok(provider.clone());
        }

        let provider = ProviderBuilder::new().on_builtin(&self.rpc_url).await?;
        info!("Connected to chain endpoint {}", mask_url(&self.rpc_url));

        *slot = Some(provider.clone());
        Ok(provider)
    }

    /// Drops the current provider; the next [`provider`](Self::provider) call reconnects.
    pub async fn reset(&self) {
        if self.provider.write().await.take().is_some() {
            debug!("Dropped chain connection to {}", mask_url(&self.rpc_url));
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.provider.read().await.is_some()
    }
}

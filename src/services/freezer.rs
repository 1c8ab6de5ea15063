use super::{connection::ChainConnection, contracts::IFreezer, credential::SigningCredential};
use crate::error::{Result, SentinelError};
use alloy::{
    network::EthereumWallet,
    primitives::{Address, TxHash},
    providers::ProviderBuilder,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// The privileged, irreversible freeze write.
#[async_trait]
pub trait FreezeExecutor: Send + Sync {
    /// Submits the freeze and waits for a successful receipt.
    async fn freeze(&self, dest_domains: &[u32]) -> Result<TxHash>;
}

/// Signs each freeze with a fresh wallet layered over the shared connection.
pub struct ChainFreezer {
    connection: Arc<ChainConnection>,
    contract: Address,
    credential: Arc<dyn SigningCredential>,
}

impl ChainFreezer {
    pub fn new(
        connection: Arc<ChainConnection>,
        contract: Address,
        credential: Arc<dyn SigningCredential>,
    ) -> Self {
        Self {
            connection,
            contract,
            credential,
        }
    }
}

#[async_trait]
impl FreezeExecutor for ChainFreezer {
    async fn freeze(&self, dest_domains: &[u32]) -> Result<TxHash> {
        let root = self
            .connection
            .provider()
            .await
            .map_err(|e| SentinelError::ChainWrite(format!("No chain connection: {}", e)))?;
        let wallet = EthereumWallet::from(self.credential.signer()?);
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_provider(root);

        let freezer = IFreezer::new(self.contract, &provider);
        let pending = freezer
            .freezeTokenAndRemoteMultiple(dest_domains.to_vec())
            .send()
            .await
            .map_err(|e| SentinelError::ChainWrite(format!("Failed to send freeze: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        info!("Freeze transaction sent: {:#x}", tx_hash);

        let receipt = pending.get_receipt().await.map_err(|e| {
            SentinelError::ChainWrite(format!("Freeze {:#x} not confirmed: {}", tx_hash, e))
        })?;

        if !receipt.status() {
            return Err(SentinelError::ChainWrite(format!(
                "Freeze transaction {:#x} reverted",
                tx_hash
            )));
        }

        info!(
            "Freeze transaction confirmed: {:#x} (block {:?})",
            tx_hash, receipt.block_number
        );
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SecretKey;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_unreachable_endpoint_is_write_error() {
        let connection = Arc::new(ChainConnection::new("ws://127.0.0.1:1".to_string()));
        let freezer = ChainFreezer::new(
            connection.clone(),
            Address::repeat_byte(0x44),
            Arc::new(SecretKey::new(DEV_KEY)),
        );

        let result = freezer.freeze(&[1, 6]).await;
        assert!(matches!(result, Err(SentinelError::ChainWrite(ref msg)) if msg.contains("No chain connection")));
        assert!(!connection.is_connected().await);
    }
}

use super::{connection::ChainConnection, contracts::IERC20};
use crate::error::{Result, SentinelError};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Read-only view of the monitored token.
#[async_trait]
pub trait TokenReader: Send + Sync {
    async fn balance_of(&self, owner: Address) -> Result<U256>;
}

pub struct TokenContract {
    connection: Arc<ChainConnection>,
    address: Address,
}

impl TokenContract {
    pub fn new(connection: Arc<ChainConnection>, address: Address) -> Self {
        Self {
            connection,
            address,
        }
    }
}

#[async_trait]
impl TokenReader for TokenContract {
    async fn balance_of(&self, owner: Address) -> Result<U256> {
        let provider = self.connection.provider().await?;
        let token = IERC20::new(self.address, &provider);

        let IERC20::balanceOfReturn { balance } = token
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| SentinelError::ChainRead(format!("balanceOf({}) failed: {}", owner, e)))?;

        debug!("Balance of {} on {}: {}", owner, self.address, balance);
        Ok(balance)
    }
}

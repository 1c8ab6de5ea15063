pub mod approval;
pub mod message;

pub use approval::{format_amount, freeze_threshold, should_freeze, ApprovalEvent, FreezeDecision};
pub use message::StreamMessage;

use crate::error::{Result, SentinelError};
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::info;

/// Owner addresses under monitoring, stored lowercase. Entries are never removed.
#[derive(Debug, Default)]
pub struct Watchlist {
    addresses: RwLock<HashSet<String>>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an address and returns its normalized form. Re-registering is a no-op.
    pub async fn register(&self, address: Option<&str>) -> Result<String> {
        let address = address
            .filter(|a| !a.is_empty())
            .ok_or_else(|| SentinelError::InvalidInput("address is required".to_string()))?;

        let normalized = address.to_lowercase();
        let mut addresses = self.addresses.write().await;
        if addresses.insert(normalized.clone()) {
            info!(
                "Watching {} (total watched: {})",
                normalized,
                addresses.len()
            );
        }

        Ok(normalized)
    }

    pub async fn contains(&self, address: &str) -> bool {
        self.addresses
            .read()
            .await
            .contains(&address.to_lowercase())
    }

    pub async fn len(&self) -> usize {
        self.addresses.read().await.len()
    }
}

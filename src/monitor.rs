use crate::{
    domain::{format_amount, ApprovalEvent, StreamMessage, Watchlist},
    engine::{FreezeEngine, FreezeOutcome},
    error::Result,
    server::BroadcastHub,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, trace};

/// Consumes decoded approvals, filters them against the watchlist and
/// hands matches to the freeze engine.
pub struct ApprovalMonitor {
    watchlist: Arc<Watchlist>,
    hub: Arc<BroadcastHub>,
    engine: Arc<FreezeEngine>,
    token_decimals: u8,
}

impl ApprovalMonitor {
    pub fn new(
        watchlist: Arc<Watchlist>,
        hub: Arc<BroadcastHub>,
        engine: Arc<FreezeEngine>,
        token_decimals: u8,
    ) -> Self {
        Self {
            watchlist,
            hub,
            engine,
            token_decimals,
        }
    }

    /// Runs until every sender of `events` is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<ApprovalEvent>) -> Result<()> {
        info!(
            "Approval monitor started (freeze action {}, {} owners watched)",
            if self.engine.is_armed() { "armed" } else { "disabled" },
            self.watchlist.len().await
        );

        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }

        info!("Approval event stream closed");
        Ok(())
    }

    /// Broadcasts a watched owner's approval and starts its freeze check on a
    /// separate task, so a slow confirmation never holds up later events.
    pub async fn handle_event(&self, event: ApprovalEvent) -> Option<JoinHandle<FreezeOutcome>> {
        if !self.watchlist.contains(&event.owner_key()).await {
            trace!("Ignoring approval by unwatched owner {}", event.owner);
            return None;
        }

        info!(
            "Approval detected: owner={} spender={} value={} ({}) tx={:#x} log_index={} block={}",
            event.owner,
            event.spender,
            event.value,
            format_amount(event.value, self.token_decimals),
            event.tx_hash,
            event.log_index,
            event.block_number
        );

        self.hub
            .publish(&StreamMessage::approval_detected(&event))
            .await;

        let engine = self.engine.clone();
        Some(tokio::spawn(async move { engine.evaluate(&event).await }))
    }
}

use crate::{
    domain::{format_amount, freeze_threshold, should_freeze, ApprovalEvent, FreezeDecision, StreamMessage},
    error::{ErrorContext, Result},
    server::BroadcastHub,
    services::{FreezeExecutor, TokenReader},
};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreezeOutcome {
    /// No freezer contract or signing key; nothing was read or sent.
    NotConfigured,
    BelowThreshold(FreezeDecision),
    Triggered(FreezeDecision),
    /// Balance read or freeze write failed. Logged, not retried.
    Failed(String),
}

/// Decides whether an approval by a watched owner warrants a freeze, and executes it.
pub struct FreezeEngine {
    token: Arc<dyn TokenReader>,
    executor: Option<Arc<dyn FreezeExecutor>>,
    dest_domains: Vec<u32>,
    token_decimals: u8,
    hub: Arc<BroadcastHub>,
}

impl FreezeEngine {
    pub fn new(
        token: Arc<dyn TokenReader>,
        executor: Option<Arc<dyn FreezeExecutor>>,
        dest_domains: Vec<u32>,
        token_decimals: u8,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            token,
            executor,
            dest_domains,
            token_decimals,
            hub,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.executor.is_some()
    }

    /// Never returns an error: failures are logged and reported as [`FreezeOutcome::Failed`].
    pub async fn evaluate(&self, event: &ApprovalEvent) -> FreezeOutcome {
        let Some(executor) = self.executor.as_ref() else {
            info!(
                "Freezer contract address or signing key not set. Freeze will not be triggered for {}",
                event.owner
            );
            return FreezeOutcome::NotConfigured;
        };

        match self.decide_and_freeze(executor.as_ref(), event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                ErrorContext::new(format!("freeze check for {}", event.owner)).log_error(&e);
                FreezeOutcome::Failed(e.to_string())
            }
        }
    }

    async fn decide_and_freeze(
        &self,
        executor: &dyn FreezeExecutor,
        event: &ApprovalEvent,
    ) -> Result<FreezeOutcome> {
        let balance = self.token.balance_of(event.owner).await?;
        let threshold = freeze_threshold(balance);

        let mut decision = FreezeDecision {
            owner: event.owner,
            approval_amount: event.value,
            user_balance: balance,
            threshold,
            triggered: false,
            tx_hash: None,
        };

        if !should_freeze(event.value, threshold) {
            info!(
                "Approval amount ({}) below 90% of balance ({}) for {}. No freeze.",
                format_amount(event.value, self.token_decimals),
                format_amount(balance, self.token_decimals),
                event.owner
            );
            return Ok(FreezeOutcome::BelowThreshold(decision));
        }

        info!(
            "Approval amount ({}) >= 90% of balance ({}) for {}. Triggering freeze...",
            format_amount(event.value, self.token_decimals),
            format_amount(balance, self.token_decimals),
            event.owner
        );

        let tx_hash = executor.freeze(&self.dest_domains).await?;
        decision.triggered = true;
        decision.tx_hash = Some(tx_hash);

        if let Some(message) = StreamMessage::freeze_triggered(&decision, &self.dest_domains) {
            self.hub.publish(&message).await;
        }

        Ok(FreezeOutcome::Triggered(decision))
    }
}

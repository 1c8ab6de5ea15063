use super::{ApprovalEvent, FreezeDecision};
use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// Messages pushed to realtime subscribers. Token amounts are decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    #[serde(rename_all = "camelCase")]
    ApprovalDetected {
        owner: Address,
        spender: Address,
        value: String,
        tx_hash: TxHash,
        log_index: u64,
        block_number: u64,
    },
    #[serde(rename_all = "camelCase")]
    FreezeTriggered {
        owner: Address,
        approval_amount: String,
        user_balance: String,
        threshold: String,
        tx_hash: TxHash,
        dest_domains: Vec<u32>,
    },
}

impl StreamMessage {
    pub fn approval_detected(event: &ApprovalEvent) -> Self {
        StreamMessage::ApprovalDetected {
            owner: event.owner,
            spender: event.spender,
            value: event.value.to_string(),
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
        }
    }

    /// `None` unless the decision triggered a confirmed freeze.
    pub fn freeze_triggered(decision: &FreezeDecision, dest_domains: &[u32]) -> Option<Self> {
        if !decision.triggered {
            return None;
        }

        Some(StreamMessage::FreezeTriggered {
            owner: decision.owner,
            approval_amount: decision.approval_amount.to_string(),
            user_balance: decision.user_balance.to_string(),
            threshold: decision.threshold.to_string(),
            tx_hash: decision.tx_hash?,
            dest_domains: dest_domains.to_vec(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::ApprovalDetected { .. } => "approval_detected",
            StreamMessage::FreezeTriggered { .. } => "freeze_triggered",
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

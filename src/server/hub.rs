use crate::domain::StreamMessage;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

pub type SubscriberId = String;
pub type SubscriberSender = mpsc::UnboundedSender<String>;

/// A live subscriber's end of the hub. Drop the receiver or call
/// [`BroadcastHub::unsubscribe`] when the connection goes away.
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::UnboundedReceiver<String>,
}

/// Fan-out of serialized [`StreamMessage`]s to connected subscribers.
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: RwLock<HashMap<SubscriberId, SubscriberSender>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = uuid::Uuid::new_v4().to_string();

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id.clone(), sender);
        info!(
            "Subscriber {} connected (total subscribers: {})",
            id,
            subscribers.len()
        );

        Subscription { id, receiver }
    }

    pub async fn unsubscribe(&self, id: &str) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(id).is_some() {
            info!(
                "Subscriber {} disconnected (remaining subscribers: {})",
                id,
                subscribers.len()
            );
        }
    }

    /// Serializes once and queues the payload for every open subscriber.
    /// Subscribers whose connection is already gone are skipped.
    pub async fn publish(&self, message: &StreamMessage) -> BroadcastResult {
        let payload = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {} message: {}", message.kind(), e);
                return BroadcastResult::default();
            }
        };

        let subscribers = self.subscribers.read().await;
        let mut result = BroadcastResult::default();

        for sender in subscribers.values() {
            if sender.is_closed() {
                result.skipped += 1;
                continue;
            }

            match sender.send(payload.clone()) {
                Ok(()) => result.delivered += 1,
                Err(_) => result.skipped += 1,
            }
        }

        debug!(
            "Broadcast {} to {}/{} subscribers",
            message.kind(),
            result.delivered,
            subscribers.len()
        );

        result
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastResult {
    pub delivered: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApprovalEvent;
    use alloy::primitives::{Address, TxHash, U256};

    fn message(value: u64) -> StreamMessage {
        StreamMessage::approval_detected(&ApprovalEvent {
            owner: Address::ZERO,
            spender: Address::ZERO,
            value: U256::from(value),
            tx_hash: TxHash::ZERO,
            log_index: 0,
            block_number: 1,
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let hub = BroadcastHub::new();
        let mut a = hub.subscribe().await;
        let mut b = hub.subscribe().await;
        let mut c = hub.subscribe().await;

        let result = hub.publish(&message(1)).await;
        assert_eq!(result.delivered, 3);

        for sub in [&mut a, &mut b, &mut c] {
            let payload = sub.receiver.recv().await.unwrap();
            assert!(payload.contains("\"type\":\"approval_detected\""));
        }
    }

    #[tokio::test]
    async fn test_unsubscribed_receives_nothing() {
        let hub = BroadcastHub::new();
        let mut kept = hub.subscribe().await;
        let mut gone = hub.subscribe().await;

        hub.unsubscribe(&gone.id).await;
        assert_eq!(hub.subscriber_count().await, 1);

        let result = hub.publish(&message(1)).await;
        assert_eq!(result.delivered, 1);
        assert!(kept.receiver.recv().await.is_some());
        // the hub dropped its sender, so the channel is closed and empty
        assert!(gone.receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_skipped() {
        let hub = BroadcastHub::new();
        let mut open = hub.subscribe().await;
        let closed = hub.subscribe().await;
        drop(closed.receiver);

        let result = hub.publish(&message(1)).await;
        assert_eq!(
            result,
            BroadcastResult {
                delivered: 1,
                skipped: 1
            }
        );
        assert!(open.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_publish_order_is_preserved() {
        let hub = BroadcastHub::new();
        let mut sub = hub.subscribe().await;

        for value in 1..=5u64 {
            hub.publish(&message(value)).await;
        }

        for value in 1..=5u64 {
            let payload = sub.receiver.recv().await.unwrap();
            assert!(payload.contains(&format!("\"value\":\"{}\"", value)));
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = BroadcastHub::new();
        assert_eq!(hub.publish(&message(1)).await, BroadcastResult::default());
    }
}

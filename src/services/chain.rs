use super::{connection::ChainConnection, contracts::IERC20};
use crate::{
    config::ChainConfig,
    domain::ApprovalEvent,
    error::{ErrorContext, Result, SentinelError},
};
use alloy::{
    primitives::Address,
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use futures_util::StreamExt;
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, info, trace, warn};

const RECONNECT_DELAY_SECS: u64 = 1;
const MAX_RECONNECT_DELAY_SECS: u64 = 30;

/// Exponential reconnect delay, reset whenever a stream delivered events.
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current: Duration::from_secs(RECONNECT_DELAY_SECS),
        }
    }

    /// Delay to wait before the next attempt.
    fn next(&mut self, delivered: usize) -> Duration {
        if delivered > 0 {
            self.current = Duration::from_secs(RECONNECT_DELAY_SECS);
        }

        let delay = self.current;
        self.current = std::cmp::min(delay * 2, Duration::from_secs(MAX_RECONNECT_DELAY_SECS));
        delay
    }
}

/// Streams `Approval` logs of one token contract into a channel.
pub struct ChainEventSource {
    connection: Arc<ChainConnection>,
    token: Address,
    poll_interval: Duration,
}

impl ChainEventSource {
    /// Fails when the endpoint or token address is unset or malformed.
    /// The endpoint itself is not contacted until [`run`](Self::run).
    pub fn from_config(config: &ChainConfig) -> Result<Self> {
        let (rpc_url, token) = config.endpoint()?;
        info!("Watching token {}", token);

        Ok(Self {
            connection: Arc::new(ChainConnection::new(rpc_url)),
            token,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }

    pub fn connection(&self) -> Arc<ChainConnection> {
        self.connection.clone()
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn filter(&self) -> Filter {
        Filter::new()
            .address(self.token)
            .event_signature(IERC20::Approval::SIGNATURE_HASH)
    }

    /// Runs until the receiving side of `sender` is dropped. Connection and
    /// subscription failures are retried with backoff.
    pub async fn run(self, sender: mpsc::Sender<ApprovalEvent>) -> Result<()> {
        let mut backoff = Backoff::new();

        while !sender.is_closed() {
            let delivered = match self.stream_into(&sender).await {
                Ok(0) => {
                    debug!("Approval stream ended without events");
                    0
                }
                Ok(delivered) => {
                    warn!("Approval stream ended after {} events", delivered);
                    delivered
                }
                Err(SentinelError::ChannelClosed(_)) => break,
                Err(e) => {
                    ErrorContext::new("approval_subscription").log_error(&e);
                    0
                }
            };

            self.connection.reset().await;
            if sender.is_closed() {
                break;
            }

            let delay = backoff.next(delivered);
            info!("Re-subscribing to approval events in {:?}", delay);
            sleep(delay).await;
        }

        info!("Event consumer gone, stopping chain event source");
        Ok(())
    }

    async fn stream_into(&self, sender: &mpsc::Sender<ApprovalEvent>) -> Result<usize> {
        let provider = self.connection.provider().await?;
        let filter = self.filter();
        let mut delivered = 0;

        if self.connection.uses_pubsub() {
            let subscription = provider.subscribe_logs(&filter).await?;
            info!("Subscribed to Approval events on {}", self.token);

            let mut stream = subscription.into_stream();
            while let Some(log) = stream.next().await {
                delivered += forward(&log, sender).await?;
            }
        } else {
            let poller = provider
                .watch_logs(&filter)
                .await?
                .with_poll_interval(self.poll_interval);
            info!(
                "Polling Approval events on {} every {:?}",
                self.token, self.poll_interval
            );

            let mut stream = poller.into_stream();
            while let Some(logs) = stream.next().await {
                trace!("Poll returned {} logs", logs.len());
                for log in &logs {
                    delivered += forward(log, sender).await?;
                }
            }
        }

        Ok(delivered)
    }
}

async fn forward(log: &Log, sender: &mpsc::Sender<ApprovalEvent>) -> Result<usize> {
    let event = match decode_approval(log) {
        Ok(Some(event)) => event,
        Ok(None) => return Ok(0),
        Err(e) => {
            warn!("Skipping undecodable Approval log: {}", e);
            return Ok(0);
        }
    };

    sender
        .send(event)
        .await
        .map_err(|e| SentinelError::ChannelClosed(e.to_string()))?;
    Ok(1)
}

/// Decodes an `Approval` log. Reorged logs and logs without position data yield `None`.
pub fn decode_approval(log: &Log) -> Result<Option<ApprovalEvent>> {
    if log.removed {
        debug!("Ignoring removed log {:?}", log.transaction_hash);
        return Ok(None);
    }

    let (Some(tx_hash), Some(log_index), Some(block_number)) =
        (log.transaction_hash, log.log_index, log.block_number)
    else {
        debug!("Ignoring pending log without position data");
        return Ok(None);
    };

    let decoded = log
        .log_decode::<IERC20::Approval>()
        .map_err(|e| SentinelError::ChainRead(format!("Failed to decode Approval: {}", e)))?;
    let approval = decoded.inner.data;

    Ok(Some(ApprovalEvent {
        owner: approval.owner,
        spender: approval.spender,
        value: approval.value,
        tx_hash,
        log_index,
        block_number,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, TxHash, U256};

    fn approval_log(removed: bool, tx_hash: Option<TxHash>) -> Log {
        let approval = IERC20::Approval {
            owner: address!("1111111111111111111111111111111111111111"),
            spender: address!("2222222222222222222222222222222222222222"),
            value: U256::from(1_000_000u64),
        };

        Log {
            inner: alloy::primitives::Log {
                address: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
                data: approval.encode_log_data(),
            },
            block_number: Some(42),
            transaction_hash: tx_hash,
            log_index: Some(3),
            removed,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_approval() {
        let hash = TxHash::repeat_byte(0x11);
        let event = decode_approval(&approval_log(false, Some(hash)))
            .unwrap()
            .unwrap();

        assert_eq!(event.owner, address!("1111111111111111111111111111111111111111"));
        assert_eq!(event.spender, address!("2222222222222222222222222222222222222222"));
        assert_eq!(event.value, U256::from(1_000_000u64));
        assert_eq!(event.tx_hash, hash);
        assert_eq!(event.log_index, 3);
        assert_eq!(event.block_number, 42);
    }

    #[test]
    fn test_removed_and_pending_logs_are_skipped() {
        let hash = TxHash::repeat_byte(0x11);
        assert!(decode_approval(&approval_log(true, Some(hash))).unwrap().is_none());
        assert!(decode_approval(&approval_log(false, None)).unwrap().is_none());
    }

    #[test]
    fn test_foreign_event_fails_to_decode() {
        let mut log = approval_log(false, Some(TxHash::repeat_byte(0x11)));
        log.inner.data = alloy::primitives::LogData::new_unchecked(vec![], Default::default());
        assert!(decode_approval(&log).is_err());
    }

    #[tokio::test]
    async fn test_forward_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let log = approval_log(false, Some(TxHash::repeat_byte(0x11)));
        assert!(matches!(
            forward(&log, &tx).await,
            Err(SentinelError::ChannelClosed(_))
        ));
    }

    fn chain_config(rpc_url: &str) -> ChainConfig {
        ChainConfig {
            rpc_url: Some(rpc_url.to_string()),
            token_address: Some("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string()),
            token_decimals: 6,
            poll_interval_secs: 2,
            event_channel_capacity: 16,
        }
    }

    #[test]
    fn test_source_requires_configuration() {
        let config = ChainConfig {
            rpc_url: None,
            ..chain_config("")
        };
        assert!(matches!(
            ChainEventSource::from_config(&config),
            Err(SentinelError::ConfigurationMissing("RPC_URL"))
        ));

        let config = ChainConfig {
            token_address: Some("0x1234".to_string()),
            ..chain_config("http://127.0.0.1:8545")
        };
        assert!(matches!(
            ChainEventSource::from_config(&config),
            Err(SentinelError::InvalidAddressFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_does_not_fail_startup() {
        let source = ChainEventSource::from_config(&chain_config("ws://127.0.0.1:1")).unwrap();
        let connection = source.connection();

        assert_eq!(connection.rpc_url(), "ws://127.0.0.1:1");
        assert!(!connection.is_connected().await);
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..7).map(|_| backoff.next(0).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_backoff_resets_after_delivery() {
        let mut backoff = Backoff::new();
        for _ in 0..4 {
            backoff.next(0);
        }

        assert_eq!(backoff.next(3), Duration::from_secs(1));
        assert_eq!(backoff.next(0), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_run_stops_when_consumer_is_gone() {
        for rpc_url in ["http://127.0.0.1:1", "ws://127.0.0.1:1"] {
            let source = ChainEventSource::from_config(&chain_config(rpc_url)).unwrap();
            let (tx, rx) = mpsc::channel(1);
            let handle = tokio::spawn(source.run(tx));

            // first attempt fails and the source is in its backoff sleep
            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(rx);

            let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
            assert!(matches!(result, Ok(Ok(Ok(())))), "{} did not stop", rpc_url);
        }
    }

    #[tokio::test]
    async fn test_run_retries_unreachable_endpoint() {
        let source = ChainEventSource::from_config(&chain_config("ws://127.0.0.1:1")).unwrap();
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(source.run(tx));

        // still backing off, not failed
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());

        drop(rx);
        handle.abort();
    }
}

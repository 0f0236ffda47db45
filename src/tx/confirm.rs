//! Receipt polling until a transaction is mined, reverted, or given up on
//!
//! A missing receipt means the transaction is not indexed yet and is retried.
//! A receipt with a non-success status is final: a reverted transaction is
//! never polled again.

use crate::chain::ChainRpc;
use crate::config::ConfirmationConfig;
use crate::error::BridgeResult;

use ethers::types::{TransactionReceipt, H256, U64};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Receipt status as seen by the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Pending,
    Success,
    Failed,
}

impl ReceiptStatus {
    pub fn from_receipt(receipt: Option<&TransactionReceipt>) -> Self {
        match receipt.and_then(|r| r.status) {
            None => ReceiptStatus::Pending,
            Some(status) if status == U64::one() => ReceiptStatus::Success,
            Some(_) => ReceiptStatus::Failed,
        }
    }
}

/// Terminal result of waiting for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Success,
    Failed,
    Timeout,
}

impl ConfirmationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConfirmationOutcome::Success)
    }
}

impl fmt::Display for ConfirmationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationOutcome::Success => write!(f, "confirmed"),
            ConfirmationOutcome::Failed => write!(f, "failed on-chain"),
            ConfirmationOutcome::Timeout => write!(f, "not mined before timeout"),
        }
    }
}

/// Polls for a receipt at a fixed interval with a bounded total wait
pub struct ConfirmationPoller {
    rpc: Arc<dyn ChainRpc>,
    explorer_url: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl ConfirmationPoller {
    pub fn new(rpc: Arc<dyn ChainRpc>, explorer_url: &str, config: &ConfirmationConfig) -> Self {
        Self {
            rpc,
            explorer_url: explorer_url.to_string(),
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Explorer link for a transaction
    pub fn tx_url(&self, tx_hash: H256) -> String {
        format!("{}tx/{:?}", self.explorer_url, tx_hash)
    }

    /// Wait for `tx_hash` to reach a terminal state
    pub async fn wait(&self, tx_hash: H256) -> BridgeResult<ConfirmationOutcome> {
        let mut elapsed = Duration::ZERO;
        let mut polls = 0u32;

        loop {
            let receipt = self.rpc.transaction_receipt(tx_hash).await?;
            polls += 1;

            match ReceiptStatus::from_receipt(receipt.as_ref()) {
                ReceiptStatus::Success => {
                    info!("Transaction was successful: {}", self.tx_url(tx_hash));
                    return Ok(ConfirmationOutcome::Success);
                }
                ReceiptStatus::Failed => {
                    error!("Transaction failed: {}", self.tx_url(tx_hash));
                    return Ok(ConfirmationOutcome::Failed);
                }
                ReceiptStatus::Pending => {
                    elapsed += self.poll_interval;
                    if elapsed > self.timeout {
                        warn!(
                            "Transaction {:?} is not in the chain after {} seconds",
                            tx_hash,
                            self.timeout.as_secs()
                        );
                        return Ok(ConfirmationOutcome::Timeout);
                    }

                    debug!(
                        "Receipt for {:?} not available yet (poll {}, {:?} elapsed)",
                        tx_hash, polls, elapsed
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainRpc;
    use crate::error::BridgeError;
    use mockall::Sequence;
    use tokio::time::Instant;

    fn receipt(status: Option<u64>) -> TransactionReceipt {
        TransactionReceipt {
            status: status.map(U64::from),
            ..Default::default()
        }
    }

    fn poller(rpc: MockChainRpc) -> ConfirmationPoller {
        ConfirmationPoller::new(
            Arc::new(rpc),
            "https://arbiscan.io/",
            &ConfirmationConfig::default(),
        )
    }

    #[test]
    fn test_receipt_status_mapping() {
        assert_eq!(ReceiptStatus::from_receipt(None), ReceiptStatus::Pending);
        assert_eq!(
            ReceiptStatus::from_receipt(Some(&receipt(None))),
            ReceiptStatus::Pending
        );
        assert_eq!(
            ReceiptStatus::from_receipt(Some(&receipt(Some(1)))),
            ReceiptStatus::Success
        );
        assert_eq!(
            ReceiptStatus::from_receipt(Some(&receipt(Some(0)))),
            ReceiptStatus::Failed
        );
    }

    #[test]
    fn test_explorer_link() {
        let poller = poller(MockChainRpc::new());
        let url = poller.tx_url(H256::repeat_byte(0xab));
        assert!(url.starts_with("https://arbiscan.io/tx/0xabab"));
        assert_eq!(url.len(), "https://arbiscan.io/tx/".len() + 66);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_receipt() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_transaction_receipt()
            .times(1)
            .returning(|_| Ok(Some(receipt(Some(1)))));

        let start = Instant::now();
        let outcome = poller(rpc).wait(H256::zero()).await.unwrap();

        assert_eq!(outcome, ConfirmationOutcome::Success);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_transaction_is_not_retried() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_transaction_receipt()
            .times(1)
            .returning(|_| Ok(Some(receipt(Some(0)))));

        let outcome = poller(rpc).wait(H256::zero()).await.unwrap();
        assert_eq!(outcome, ConfirmationOutcome::Failed);
        assert!(!outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_bounded_polls() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_transaction_receipt()
            .times(13)
            .returning(|_| Ok(None));

        let start = Instant::now();
        let outcome = poller(rpc).wait(H256::zero()).await.unwrap();

        assert_eq!(outcome, ConfirmationOutcome::Timeout);
        assert_eq!(start.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_success() {
        let mut rpc = MockChainRpc::new();
        let mut seq = Sequence::new();
        rpc.expect_transaction_receipt()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        rpc.expect_transaction_receipt()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(receipt(None))));
        rpc.expect_transaction_receipt()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(receipt(Some(1)))));

        let start = Instant::now();
        let outcome = poller(rpc).wait(H256::zero()).await.unwrap();

        assert_eq!(outcome, ConfirmationOutcome::Success);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_error_propagates() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_transaction_receipt().times(1).returning(|_| {
            Err(BridgeError::ChainConnection {
                chain_id: 42161,
                message: "All providers failed".to_string(),
            })
        });

        assert!(poller(rpc).wait(H256::zero()).await.is_err());
    }
}

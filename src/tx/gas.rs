//! Fee estimation from recent fee history

use crate::chain::ChainRpc;
use crate::config::FeeConfig;
use crate::error::BridgeResult;

use ethers::types::U256;
use std::sync::Arc;
use tracing::debug;

/// Fee model of a transaction. A draft carries exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasPrice {
    Legacy(U256),
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

/// Gas fee estimator for bridge transactions
pub struct FeeEstimator {
    rpc: Arc<dyn ChainRpc>,
    fee_history_blocks: u64,
    reward_percentile: f64,
    /// Base fee buffer in thousandths (1250 = 1.25x)
    base_fee_permille: u64,
}

impl FeeEstimator {
    /// Create a new fee estimator
    pub fn new(rpc: Arc<dyn ChainRpc>, config: &FeeConfig) -> Self {
        Self {
            rpc,
            fee_history_blocks: config.fee_history_blocks,
            reward_percentile: config.reward_percentile,
            base_fee_permille: config.base_fee_permille(),
        }
    }

    /// Mean non-zero priority fee over the sampled blocks
    pub async fn priority_fee(&self) -> BridgeResult<U256> {
        let rewards = self
            .rpc
            .fee_history_rewards(self.fee_history_blocks, self.reward_percentile)
            .await?;

        let fee = mean_priority_fee(&rewards);
        debug!(
            "Priority fee over {} blocks at p{}: {}",
            rewards.len(),
            self.reward_percentile,
            fee
        );
        Ok(fee)
    }

    /// EIP-1559 fee fields for a new transaction
    pub async fn eip1559_fees(&self) -> BridgeResult<GasPrice> {
        let base_fee = self.rpc.gas_price().await?;
        let mut priority_fee = self.priority_fee().await?;

        // No contention in the sampled blocks
        if priority_fee.is_zero() {
            priority_fee = base_fee;
        }

        let fees = GasPrice::Eip1559 {
            max_fee_per_gas: max_fee(base_fee, priority_fee, self.base_fee_permille),
            max_priority_fee_per_gas: priority_fee,
        };
        debug!("EIP-1559 fees: {:?} (base fee {})", fees, base_fee);
        Ok(fees)
    }

    /// Buffered gas price for a legacy transaction
    pub async fn legacy_gas_price(&self) -> BridgeResult<GasPrice> {
        let gas_price = self.rpc.gas_price().await?;
        Ok(GasPrice::Legacy(apply_permille(gas_price, self.base_fee_permille)))
    }
}

/// Mean of the non-zero first-percentile rewards, ties rounded to even; zero when every block was empty
pub fn mean_priority_fee(rewards: &[Vec<U256>]) -> U256 {
    let non_empty: Vec<U256> = rewards
        .iter()
        .filter_map(|block| block.first().copied())
        .filter(|reward| !reward.is_zero())
        .collect();

    let divisor = U256::from(non_empty.len().max(1));
    let sum = non_empty
        .iter()
        .fold(U256::zero(), |acc, reward| acc.saturating_add(*reward));

    let quotient = sum / divisor;
    let twice_remainder = (sum % divisor) * 2;

    if twice_remainder > divisor || (twice_remainder == divisor && quotient.bit(0)) {
        quotient + 1
    } else {
        quotient
    }
}

/// `base_fee * multiplier + priority_fee`
pub fn max_fee(base_fee: U256, priority_fee: U256, base_fee_permille: u64) -> U256 {
    apply_permille(base_fee, base_fee_permille).saturating_add(priority_fee)
}

/// Multiply by a factor expressed in thousandths, truncating
pub fn apply_permille(value: U256, permille: u64) -> U256 {
    value.saturating_mul(U256::from(permille)) / U256::from(1000u64)
}

//! Account derived from a private key, plus amount conversion helpers

use crate::error::{BridgeError, BridgeResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::{parse_units, to_checksum};

/// Signing account for the lifetime of the process
#[derive(Clone)]
pub struct Account {
    wallet: LocalWallet,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.checksum_address())
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Parse a hex private key, with or without the `0x` prefix
    pub fn from_private_key(key: &str) -> BridgeResult<Self> {
        let key = key.trim();
        let hex_part = key.strip_prefix("0x").unwrap_or(key);

        if hex_part.len() != 64 || hex::decode(hex_part).is_err() {
            return Err(BridgeError::Wallet(
                "Private key must be 32 bytes of hex (64 or 66 characters)".to_string(),
            ));
        }

        let wallet = hex_part
            .parse::<LocalWallet>()
            .map_err(|e| BridgeError::Wallet(format!("Invalid private key: {}", e)))?;

        Ok(Self { wallet })
    }

    /// Load the key from an environment variable
    pub fn from_env(var: &str) -> BridgeResult<Option<Self>> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Self::from_private_key(&key).map(Some),
            _ => Ok(None),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn checksum_address(&self) -> String {
        to_checksum(&self.wallet.address(), None)
    }

    /// Sign a transaction for `chain_id` and return the RLP-encoded payload
    pub async fn sign(&self, tx: &TypedTransaction, chain_id: u64) -> BridgeResult<Bytes> {
        let wallet = self.wallet.clone().with_chain_id(chain_id);
        let signature = wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| BridgeError::Wallet(format!("Failed to sign transaction: {}", e)))?;

        Ok(tx.rlp_signed(&signature))
    }
}

/// Convert a decimal amount into the smallest unit.
///
/// Only 6, 9 and 18 decimals are recognised.
pub fn to_wei(amount: &str, decimals: u32) -> BridgeResult<U256> {
    if !matches!(decimals, 6 | 9 | 18) {
        return Err(BridgeError::InvalidInput(format!(
            "Can not find unit name with decimals: {}",
            decimals
        )));
    }

    let amount = amount.trim();
    if amount.is_empty() || amount.starts_with('-') {
        return Err(BridgeError::InvalidInput(format!(
            "Amount must be a positive number, got {:?}",
            amount
        )));
    }

    let parsed = parse_units(amount, decimals)
        .map_err(|e| BridgeError::InvalidInput(format!("Amount {:?} is not a number: {}", amount, e)))?;
    let wei: U256 = parsed.into();

    if wei.is_zero() {
        return Err(BridgeError::InvalidInput("Amount must be greater than zero".to_string()));
    }

    Ok(wei)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Well-known development key (anvil account #0)
    pub(crate) const TEST_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_private_key_with_and_without_prefix() {
        let prefixed = Account::from_private_key(TEST_KEY).unwrap();
        let bare = Account::from_private_key(&TEST_KEY[2..]).unwrap();

        assert_eq!(prefixed.address(), bare.address());
        assert_eq!(
            prefixed.checksum_address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_private_key_rejects_bad_input() {
        assert!(Account::from_private_key("").is_err());
        assert!(Account::from_private_key("0x1234").is_err());
        assert!(Account::from_private_key(&"zz".repeat(32)).is_err());
        assert!(Account::from_private_key(&format!("{}00", TEST_KEY)).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let account = Account::from_private_key(TEST_KEY).unwrap();
        let rendered = format!("{:?}", account);
        assert!(rendered.contains("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert!(!rendered.contains(&TEST_KEY[2..]));
    }

    #[test]
    fn test_sign_eip1559_payload() {
        use ethers::types::Eip1559TransactionRequest;

        let account = Account::from_private_key(TEST_KEY).unwrap();
        let tx: TypedTransaction = Eip1559TransactionRequest::new()
            .from(account.address())
            .to(Address::repeat_byte(0x33))
            .value(1u64)
            .nonce(0u64)
            .gas(21_000u64)
            .max_fee_per_gas(2_000_000_000u64)
            .max_priority_fee_per_gas(1_000_000u64)
            .chain_id(8453u64)
            .into();

        let raw = tokio_test::assert_ok!(tokio_test::block_on(account.sign(&tx, 8453)));
        assert_eq!(raw.first(), Some(&0x02));

        let again = tokio_test::block_on(account.sign(&tx, 8453)).unwrap();
        assert_eq!(raw, again);
    }

    #[test]
    fn test_to_wei() {
        assert_eq!(to_wei("0.0001", 18).unwrap(), U256::from(100_000_000_000_000u64));
        assert_eq!(to_wei("1", 9).unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(to_wei(" 2.5 ", 6).unwrap(), U256::from(2_500_000u64));
    }

    #[test]
    fn test_to_wei_rejects_bad_amounts() {
        assert!(to_wei("abc", 18).is_err());
        assert!(to_wei("", 18).is_err());
        assert!(to_wei("-1", 18).is_err());
        assert!(to_wei("0", 18).is_err());
        assert!(to_wei("1", 8).is_err());
    }
}

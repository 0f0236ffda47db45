//! XY Finance aggregator request and response types

use ethers::types::{Address, Bytes, U256};
use ethers::utils::to_checksum;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Token address the aggregator uses for the chain's native currency
pub const NATIVE_TOKEN_ADDRESS: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// Parameters shared by the quote and build endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    /// Amount in the smallest unit of the source native token
    pub amount: U256,
    /// Slippage tolerance in percent
    pub slippage: f64,
}

impl QuoteRequest {
    /// Query parameters for `/quote`
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("srcChainId", self.src_chain_id.to_string()),
            ("srcQuoteTokenAddress", NATIVE_TOKEN_ADDRESS.to_string()),
            ("srcQuoteTokenAmount", self.amount.to_string()),
            ("dstChainId", self.dst_chain_id.to_string()),
            ("dstQuoteTokenAddress", NATIVE_TOKEN_ADDRESS.to_string()),
            ("slippage", self.slippage.to_string()),
        ]
    }

    /// Query parameters for `/buildTx`
    pub fn build_query(&self, receiver: Address, route: &Route) -> Vec<(&'static str, String)> {
        let bridge = &route.bridge_description;
        let mut query = self.query();
        query.extend([
            ("receiver", to_checksum(&receiver, None)),
            ("bridgeProvider", bridge.provider.clone()),
            ("srcBridgeTokenAddress", bridge.src_bridge_token_address.clone()),
            ("dstBridgeTokenAddress", bridge.dst_bridge_token_address.clone()),
        ]);
        query
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedChainsResponse {
    pub supported_chains: Vec<SupportedChain>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedChain {
    pub chain_id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(default)]
    pub routes: Option<Vec<Route>>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

/// One bridge path offered by the aggregator
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub bridge_description: BridgeDescription,
    #[serde(default)]
    pub dst_quote_token_amount: Option<String>,
    #[serde(default)]
    pub min_receive_amount: Option<String>,
    #[serde(default)]
    pub estimated_transfer_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeDescription {
    pub provider: String,
    pub src_bridge_token_address: String,
    pub dst_bridge_token_address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTxResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub tx: Option<BuiltTransaction>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

/// Call payload returned by `/buildTx`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuiltTransaction {
    pub to: Address,
    pub data: Bytes,
    #[serde(deserialize_with = "deserialize_amount")]
    pub value: U256,
}

/// Accepts a JSON number, a decimal string, or a `0x` hex string
fn deserialize_amount<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(U256::from(n)),
        Raw::Text(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) if hex.is_empty() => Ok(U256::zero()),
                Some(hex) => U256::from_str_radix(hex, 16).map_err(de::Error::custom),
                None => U256::from_dec_str(s).map_err(de::Error::custom),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_built_transaction_value_formats() {
        for value in [json!("0x5af3107a4000"), json!("100000000000000"), json!(100000000000000u64)] {
            let tx: BuiltTransaction = serde_json::from_value(json!({
                "to": "0x7D26F09d4e2d032Efa0729fC31a4c2Db8a2394b1",
                "data": "0xabcdef",
                "value": value,
            }))
            .unwrap();
            assert_eq!(tx.value, U256::from(100_000_000_000_000u64));
            assert_eq!(tx.data.to_vec(), vec![0xab, 0xcd, 0xef]);
        }
    }

    #[test]
    fn test_built_transaction_rejects_garbage_value() {
        let result: Result<BuiltTransaction, _> = serde_json::from_value(json!({
            "to": "0x7D26F09d4e2d032Efa0729fC31a4c2Db8a2394b1",
            "data": "0x",
            "value": "ten",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_build_query_includes_route_fields() {
        let request = QuoteRequest {
            src_chain_id: 42161,
            dst_chain_id: 10,
            amount: U256::from(100_000_000_000_000u64),
            slippage: 1.0,
        };
        let route = Route {
            bridge_description: BridgeDescription {
                provider: "yBridge".to_string(),
                src_bridge_token_address: NATIVE_TOKEN_ADDRESS.to_string(),
                dst_bridge_token_address: NATIVE_TOKEN_ADDRESS.to_string(),
            },
            dst_quote_token_amount: None,
            min_receive_amount: None,
            estimated_transfer_time: None,
        };
        let receiver: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();

        let query = request.build_query(receiver, &route);
        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("srcChainId"), "42161");
        assert_eq!(get("dstChainId"), "10");
        assert_eq!(get("srcQuoteTokenAmount"), "100000000000000");
        assert_eq!(get("slippage"), "1");
        assert_eq!(get("bridgeProvider"), "yBridge");
        assert_eq!(get("receiver"), "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    }
}

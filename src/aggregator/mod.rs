//! XY Finance aggregator client
//!
//! Three endpoints are used: `/supportedChains`, `/quote` and `/buildTx`.
//! Any status other than 200/201, a quote without routes, or a build without
//! `success` aborts the operation.

pub mod types;

pub use types::{BuiltTransaction, QuoteRequest, Route, SupportedChain};

use crate::config::AggregatorConfig;
use crate::error::{BridgeError, BridgeResult};
use types::{BuildTxResponse, QuoteResponse, SupportedChainsResponse};

use async_trait::async_trait;
use ethers::types::Address;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

#[cfg(test)]
use mockall::automock;

/// Route and payload provider for a bridge transfer
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Chains the aggregator can bridge between
    async fn supported_chains(&self) -> BridgeResult<Vec<SupportedChain>>;

    /// Best route for the request
    async fn quote(&self, request: &QuoteRequest) -> BridgeResult<Route>;

    /// On-chain call payload for a quoted route
    async fn build_tx(
        &self,
        request: &QuoteRequest,
        receiver: Address,
        route: &Route,
    ) -> BridgeResult<BuiltTransaction>;
}

/// HTTP client for the XY Finance v1 API
#[derive(Debug, Clone)]
pub struct XyFinanceClient {
    client: Client,
    base_url: String,
}

impl XyFinanceClient {
    pub fn new(config: &AggregatorConfig) -> BridgeResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> BridgeResult<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let body: Value = response.json().await?;
            debug!("Response {}: {}", path, body);
            return Ok(body);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Bad request to {}: status {}", url, status);
        Err(BridgeError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Aggregator for XyFinanceClient {
    async fn supported_chains(&self) -> BridgeResult<Vec<SupportedChain>> {
        let body = self.get("supportedChains", &[]).await?;
        parse_supported_chains(body)
    }

    async fn quote(&self, request: &QuoteRequest) -> BridgeResult<Route> {
        let body = self.get("quote", &request.query()).await?;
        let route = parse_quote(body, request)?;
        info!(
            "Quote {} -> {} via {}: receive {} (min {}), ~{}s",
            request.src_chain_id,
            request.dst_chain_id,
            route.bridge_description.provider,
            route.dst_quote_token_amount.as_deref().unwrap_or("?"),
            route.min_receive_amount.as_deref().unwrap_or("?"),
            route.estimated_transfer_time.unwrap_or_default()
        );
        Ok(route)
    }

    async fn build_tx(
        &self,
        request: &QuoteRequest,
        receiver: Address,
        route: &Route,
    ) -> BridgeResult<BuiltTransaction> {
        let body = self
            .get("buildTx", &request.build_query(receiver, route))
            .await?;
        let tx = parse_build(body)?;
        info!("Built bridge call to {:?}", tx.to);
        Ok(tx)
    }
}

fn parse_supported_chains(body: Value) -> BridgeResult<Vec<SupportedChain>> {
    if body.get("supportedChains").is_none() {
        return Err(BridgeError::MissingField("supportedChains"));
    }
    let response: SupportedChainsResponse = serde_json::from_value(body)?;
    Ok(response.supported_chains)
}

/// First route of a quote; a missing or empty `routes` field means no route
fn parse_quote(body: Value, request: &QuoteRequest) -> BridgeResult<Route> {
    let response: QuoteResponse = serde_json::from_value(body)?;

    match response.routes.and_then(|routes| routes.into_iter().next()) {
        Some(route) => Ok(route),
        None => {
            error!(
                "No route for {} -> {}: {}",
                request.src_chain_id,
                request.dst_chain_id,
                response.error_msg.unwrap_or_default()
            );
            Err(BridgeError::NoRoute {
                src_chain_id: request.src_chain_id,
                dst_chain_id: request.dst_chain_id,
            })
        }
    }
}

fn parse_build(body: Value) -> BridgeResult<BuiltTransaction> {
    let raw = body.to_string();
    let response: BuildTxResponse = serde_json::from_value(body)?;

    if !response.success {
        error!(
            "Build rejected: {}",
            response.error_msg.as_deref().unwrap_or("no error message")
        );
        return Err(BridgeError::Api {
            status: StatusCode::OK.as_u16(),
            body: raw,
        });
    }

    response.tx.ok_or(BridgeError::MissingField("tx"))
}

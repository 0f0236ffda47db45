//! XY Bridge - native ETH bridging between Arbitrum, Optimism and Base
//!
//! Asks the XY Finance aggregator for a route and a call payload, signs the
//! resulting transaction locally, broadcasts it on the source chain and polls
//! until it is mined or the wait times out.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ethers::types::U256;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

mod aggregator;
mod bridge;
mod chain;
mod cli;
mod config;
mod error;
mod tx;
mod wallet;

use aggregator::{Aggregator, SupportedChain, XyFinanceClient};
use bridge::BridgeOrchestrator;
use chain::ChainProvider;
use cli::{parse_chain, Cli, Command, Direction, Prompter};
use config::Settings;
use error::BridgeError;
use wallet::{to_wei, Account};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_file.as_deref(), cli.json_logs)?;

    info!("Starting XY Bridge v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(cli.config.as_deref())?;
    info!("Loaded configuration for {} chains", settings.chains.len());

    let aggregator: Arc<dyn Aggregator> = Arc::new(XyFinanceClient::new(&settings.aggregator)?);

    match cli.command {
        Command::Chains => {
            let chains = supported_chains(aggregator.as_ref()).await?;
            let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
            prompter.show_chains(&chains)
        }
        Command::Bridge {
            from,
            to,
            amount,
            private_key_env,
        } => {
            let result = run_bridge(&settings, aggregator, from, to, amount, &private_key_env).await;
            if let Err(e) = &result {
                error!("Bridge aborted: {:#}", e);
                if e
                    .downcast_ref::<BridgeError>()
                    .is_some_and(|e| e.is_retryable())
                {
                    info!("The failure looks transient; the bridge can be retried");
                }
            }
            result
        }
    }
}

/// Every chain the aggregator can bridge between
async fn supported_chains(aggregator: &dyn Aggregator) -> Result<Vec<SupportedChain>> {
    aggregator
        .supported_chains()
        .await
        .context("Failed to fetch supported chains")
}

/// Chains supported by the aggregator that also have an RPC configured
async fn usable_chains(
    settings: &Settings,
    aggregator: &dyn Aggregator,
) -> Result<Vec<SupportedChain>> {
    Ok(supported_chains(aggregator)
        .await?
        .into_iter()
        .filter(|c| settings.get_chain_by_id(c.chain_id).is_some())
        .collect())
}

async fn run_bridge(
    settings: &Settings,
    aggregator: Arc<dyn Aggregator>,
    from: Option<u64>,
    to: Option<u64>,
    amount: Option<String>,
    private_key_env: &str,
) -> Result<()> {
    let chains = usable_chains(settings, aggregator.as_ref()).await?;
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
    prompter.show_chains(&chains)?;

    let (src, dst) = match (from, to) {
        (None, None) => prompter.chain_pair(&chains)?,
        (Some(src), Some(dst)) => {
            let src = parse_chain(&src.to_string(), &chains)?;
            let dst = parse_chain(&dst.to_string(), &chains)?;
            if src == dst {
                bail!("INPUT and OUTPUT chains must be different");
            }
            (src, dst)
        }
        (Some(src), None) => {
            let src = parse_chain(&src.to_string(), &chains)?;
            let mut dst = prompter.chain(Direction::Output, &chains)?;
            while dst == src {
                prompter.say("INPUT and OUTPUT chains must be different!")?;
                dst = prompter.chain(Direction::Output, &chains)?;
            }
            (src, dst)
        }
        (None, Some(dst)) => {
            let dst = parse_chain(&dst.to_string(), &chains)?;
            let mut src = prompter.chain(Direction::Input, &chains)?;
            while src == dst {
                prompter.say("INPUT and OUTPUT chains must be different!")?;
                src = prompter.chain(Direction::Input, &chains)?;
            }
            (src, dst)
        }
    };

    let account = match Account::from_env(private_key_env)? {
        Some(account) => account,
        None => prompter.private_key()?,
    };
    info!("Using account {}", account.checksum_address());

    let (name, chain_config) = settings
        .get_chain_by_id(src)
        .with_context(|| format!("Chain {} is not configured", src))?;
    let rpc = Arc::new(ChainProvider::connect(name, chain_config.clone()).await?);

    let orchestrator = BridgeOrchestrator::new(settings, src, account, rpc, aggregator)?;

    let amount: U256 = match amount {
        Some(value) => {
            let wei = to_wei(&value, 18)?;
            if !orchestrator.check_balance(wei).await? {
                bail!("Not enough balance for {} ETH", value);
            }
            wei
        }
        None => loop {
            let wei = prompter.amount()?;
            if orchestrator.check_balance(wei).await? {
                break wei;
            }
            prompter.insufficient_balance()?;
        },
    };
    info!("Balance check passed for {} WEI", amount);

    let outcome = orchestrator
        .execute(dst, amount)
        .await
        .context("Bridge operation failed")?;

    prompter.say(&format!("Bridge transaction {}", outcome))?;
    if !outcome.is_success() {
        bail!("Bridge transaction {}", outcome);
    }
    Ok(())
}

fn init_logging(log_file: Option<&Path>, json: bool) -> Result<()> {
    use std::sync::Mutex;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xy_bridge=debug,hyper=warn,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;
            let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            if json {
                registry.with(layer.json()).init();
            } else {
                registry.with(layer).init();
            }
        }
        None => {
            let layer = fmt::layer().with_target(true).with_writer(io::stderr);
            if json {
                registry.with(layer.json()).init();
            } else {
                registry.with(layer).init();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MockAggregator;

    fn chain(chain_id: u64, name: &str) -> SupportedChain {
        SupportedChain {
            chain_id,
            name: name.to_string(),
        }
    }

    fn aggregator() -> MockAggregator {
        let mut aggregator = MockAggregator::new();
        aggregator.expect_supported_chains().returning(|| {
            Ok(vec![
                chain(1, "Ethereum"),
                chain(42161, "Arbitrum"),
                chain(10, "Optimism"),
                chain(8453, "Base"),
            ])
        });
        aggregator
    }

    #[tokio::test]
    async fn test_chain_listing_is_unfiltered() {
        let chains = supported_chains(&aggregator()).await.unwrap();
        let ids: Vec<u64> = chains.iter().map(|c| c.chain_id).collect();
        assert_eq!(ids, vec![1, 42161, 10, 8453]);
    }

    #[tokio::test]
    async fn test_bridge_chains_require_configured_rpc() {
        let settings = Settings::default();
        let chains = usable_chains(&settings, &aggregator()).await.unwrap();
        let ids: Vec<u64> = chains.iter().map(|c| c.chain_id).collect();
        assert_eq!(ids, vec![42161, 10, 8453]);
    }
}

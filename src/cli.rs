//! Command-line arguments and interactive prompts

use crate::aggregator::SupportedChain;
use crate::error::BridgeError;
use crate::wallet::{to_wei, Account};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ethers::types::U256;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Bridge native ETH between L2s through the XY Finance aggregator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List chains supported by the aggregator
    Chains,

    /// Bridge native tokens; missing values are asked for interactively
    Bridge {
        /// Source chain ID
        #[arg(long)]
        from: Option<u64>,

        /// Destination chain ID
        #[arg(long)]
        to: Option<u64>,

        /// Amount in ETH, e.g. 0.0001
        #[arg(long)]
        amount: Option<String>,

        /// Environment variable holding the private key
        #[arg(long, default_value = "BRIDGE_PRIVATE_KEY")]
        private_key_env: String,
    },
}

/// Which side of the bridge a chain is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn label(&self) -> &'static str {
        match self {
            Direction::Input => "INPUT",
            Direction::Output => "OUTPUT",
        }
    }
}

/// Check a chain ID typed by the user against the chains that can be used
pub fn parse_chain(input: &str, available: &[SupportedChain]) -> Result<u64, BridgeError> {
    let chain_id: u64 = input
        .trim()
        .parse()
        .map_err(|_| BridgeError::InvalidInput(format!("{:?} is not a chain ID", input.trim())))?;

    if available.iter().any(|c| c.chain_id == chain_id) {
        Ok(chain_id)
    } else {
        Err(BridgeError::ChainNotFound { chain_id })
    }
}

/// Line-oriented prompts with re-prompting on invalid input
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("Input closed");
        }
        Ok(line.trim().to_string())
    }

    /// Print one line
    pub fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    /// Print the chain list
    pub fn show_chains(&mut self, chains: &[SupportedChain]) -> Result<()> {
        self.say("Available chains on XY Finance:\n")?;
        for chain in chains {
            self.say(&format!("{} ({})", chain.chain_id, chain.name))?;
        }
        self.say("")
    }

    /// Ask until a usable chain ID is entered
    pub fn chain(&mut self, direction: Direction, available: &[SupportedChain]) -> Result<u64> {
        loop {
            let answer = self.ask(&format!(
                "Enter available {} chainId for bridge: ",
                direction.label()
            ))?;

            match parse_chain(&answer, available) {
                Ok(chain_id) => {
                    info!("Blockchain {} is correct", chain_id);
                    return Ok(chain_id);
                }
                Err(BridgeError::ChainNotFound { chain_id }) => {
                    info!("Blockchain {} not available", chain_id);
                    self.say("Blockchain not available! Please try again!\n")?;
                }
                Err(_) => {
                    warn!("Blockchain input {:?} not correct", answer);
                    self.say("Blockchain not correct! Please try again!\n")?;
                }
            }
        }
    }

    /// Ask for a source and destination until they differ
    pub fn chain_pair(&mut self, available: &[SupportedChain]) -> Result<(u64, u64)> {
        loop {
            let src = self.chain(Direction::Input, available)?;
            let dst = self.chain(Direction::Output, available)?;
            if src != dst {
                return Ok((src, dst));
            }
            self.say("INPUT and OUTPUT chains must be different!")?;
        }
    }

    /// Ask until a valid private key is entered
    pub fn private_key(&mut self) -> Result<Account> {
        loop {
            let answer = self.ask("Enter private key: ")?;
            match Account::from_private_key(&answer) {
                Ok(account) => {
                    info!("Private key accepted for {}", account.checksum_address());
                    return Ok(account);
                }
                Err(e) => {
                    // the rejected input is never logged
                    warn!("Private key rejected: {}", e);
                    self.say("Private key not correct!")?;
                }
            }
        }
    }

    /// Ask until a positive ETH amount is entered, returned in wei
    pub fn amount(&mut self) -> Result<U256> {
        loop {
            let answer = self.ask(
                "\nEnter value of native token for bridge in ETH (format example-\"0.0001\"): ",
            )?;
            match to_wei(&answer, 18) {
                Ok(wei) => return Ok(wei),
                Err(e) => {
                    warn!("Amount input not correct: {}", e);
                    self.say("Amount not number! Please try again!\n")?;
                }
            }
        }
    }

    /// Report an amount the balance cannot cover
    pub fn insufficient_balance(&mut self) -> Result<()> {
        self.say("\nNot enough balance for this amount! Please change amount!\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::tests::TEST_KEY;
    use std::io::Cursor;

    fn chains() -> Vec<SupportedChain> {
        [(42161, "Arbitrum"), (10, "Optimism"), (8453, "Base")]
            .into_iter()
            .map(|(chain_id, name)| SupportedChain {
                chain_id,
                name: name.to_string(),
            })
            .collect()
    }

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_parse_chain() {
        assert_eq!(parse_chain(" 10 ", &chains()).unwrap(), 10);
        assert!(matches!(
            parse_chain("1", &chains()),
            Err(BridgeError::ChainNotFound { chain_id: 1 })
        ));
        assert!(matches!(
            parse_chain("arbitrum", &chains()),
            Err(BridgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_chain_prompt_retries_until_valid() {
        let mut p = prompter("abc\n1\n8453\n");
        assert_eq!(p.chain(Direction::Input, &chains()).unwrap(), 8453);

        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("Blockchain not correct!"));
        assert!(shown.contains("Blockchain not available!"));
        assert_eq!(shown.matches("Enter available INPUT chainId").count(), 3);
    }

    #[test]
    fn test_chain_pair_must_differ() {
        let mut p = prompter("10\n10\n42161\n10\n");
        assert_eq!(p.chain_pair(&chains()).unwrap(), (42161, 10));

        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("must be different"));
    }

    #[test]
    fn test_private_key_prompt() {
        let mut p = prompter(&format!("not-a-key\n{}\n", TEST_KEY));
        let account = p.private_key().unwrap();
        assert_eq!(
            account.checksum_address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );

        let shown = String::from_utf8(p.output).unwrap();
        assert_eq!(shown.matches("Private key not correct!").count(), 1);
    }

    #[test]
    fn test_amount_prompt() {
        let mut p = prompter("lots\n0\n0.0001\n");
        assert_eq!(p.amount().unwrap(), U256::from(100_000_000_000_000u64));
    }

    #[test]
    fn test_closed_input_stops_prompting() {
        let mut p = prompter("");
        assert!(p.amount().is_err());
    }

    #[test]
    fn test_cli_parses_bridge_flags() {
        let cli = Cli::try_parse_from([
            "xy-bridge",
            "bridge",
            "--from",
            "42161",
            "--to",
            "10",
            "--amount",
            "0.0001",
        ])
        .unwrap();

        match cli.command {
            Command::Bridge {
                from,
                to,
                amount,
                private_key_env,
            } => {
                assert_eq!(from, Some(42161));
                assert_eq!(to, Some(10));
                assert_eq!(amount.as_deref(), Some("0.0001"));
                assert_eq!(private_key_env, "BRIDGE_PRIVATE_KEY");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

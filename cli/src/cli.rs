//! # CLI Interface
//!
//! Defines the command-line argument structure for `mintline` using `clap`
//! derive. Supports three subcommands: `provision`, `airdrop`, and
//! `version`. Every ledger option can also be set through a `MINTLINE_*`
//! environment variable.

use clap::{Args, Parser, Subcommand, ValueEnum};

use mintline_core::amount::{Amount, AmountError};
use mintline_core::config::{Cluster, DEFAULT_RUN_TIMEOUT};
use mintline_core::ledger::Commitment;

use crate::logging::LogFormat;

/// Fungible token provisioner.
///
/// Creates a throwaway operator identity, funds it from the cluster faucet,
/// creates a mint and a token account, mints supply, and reports every
/// balance along the way.
#[derive(Parser, Debug)]
#[command(
    name = "mintline",
    about = "Provision and exercise a fungible token on a remote ledger",
    version,
    propagate_version = true
)]
pub struct MintlineCli {
    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, env = "MINTLINE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Default log filter. `RUST_LOG` takes precedence when set.
    #[arg(
        long,
        global = true,
        env = "MINTLINE_LOG_LEVEL",
        default_value = "mintline=info,mintline_core=info"
    )]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full token pipeline: fund, create mint and account, mint.
    Provision(ProvisionArgs),
    /// Query the balance, request faucet funds, query again.
    Airdrop(AirdropArgs),
    /// Print version information and exit.
    Version,
}

/// Where ledger calls go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// The cluster's JSON-RPC endpoint.
    Rpc,
    /// A simulated cluster inside the process. Nothing leaves the machine.
    Memory,
}

/// Checkpoint output on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Options shared by every pipeline subcommand.
#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Ledger backend.
    #[arg(long, value_enum, env = "MINTLINE_BACKEND", default_value = "rpc")]
    pub backend: Backend,

    /// Cluster whose public endpoint to use: devnet, testnet, or localnet.
    #[arg(long, env = "MINTLINE_CLUSTER", default_value = "devnet")]
    pub cluster: Cluster,

    /// Explicit JSON-RPC endpoint. Overrides `--cluster`.
    #[arg(long, env = "MINTLINE_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Commitment for reads and confirmations.
    #[arg(long, env = "MINTLINE_COMMITMENT", default_value = "confirmed")]
    pub commitment: Commitment,

    /// Overall run timeout in seconds. 0 disables it.
    #[arg(long, env = "MINTLINE_TIMEOUT_SECS", default_value_t = DEFAULT_RUN_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Checkpoint output format.
    #[arg(long, value_enum, env = "MINTLINE_OUTPUT", default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the `provision` subcommand.
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Faucet request for the operator, in whole or fractional units.
    #[arg(long, env = "MINTLINE_FUND", default_value = "1", value_parser = parse_amount)]
    pub fund: Amount,

    /// Supply to mint into the operator's token account, in units.
    #[arg(long, env = "MINTLINE_MINT", default_value = "100", value_parser = parse_amount)]
    pub mint: Amount,
}

/// Arguments for the `airdrop` subcommand.
#[derive(Args, Debug)]
pub struct AirdropArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Faucet request, in units.
    #[arg(long, env = "MINTLINE_AMOUNT", default_value = "2", value_parser = parse_amount)]
    pub amount: Amount,
}

fn parse_amount(s: &str) -> Result<Amount, AmountError> {
    Amount::parse_units(s)
}

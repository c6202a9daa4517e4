//! # Provisioning Configuration & Constants
//!
//! Every magic number Mintline depends on lives here: the unit scale shared
//! by the funding and reporting paths, the default quantities of the two
//! preset pipelines, cluster endpoints, and the fee schedule the in-memory
//! ledger charges.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Version of the core library.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Smallest units per human unit. One SOL is 10^9 lamports, and the minted
/// token uses the same scale so a single constant serves every report.
pub const UNIT_SCALE: u64 = 1_000_000_000;

/// Number of fractional digits implied by [`UNIT_SCALE`].
pub const UNIT_DECIMALS: usize = 9;

/// Decimals of every mint this tool creates. Pinned to [`UNIT_DECIMALS`];
/// a mint with a different precision would be misreported.
pub const TOKEN_DECIMALS: u8 = 9;

/// Ticker shown next to native balances.
pub const NATIVE_SYMBOL: &str = "SOL";

// ---------------------------------------------------------------------------
// Preset quantities (human units)
// ---------------------------------------------------------------------------

/// Faucet funding requested by the token provisioning pipeline.
pub const DEFAULT_FUND_UNITS: u64 = 1;

/// Faucet funding requested by the airdrop pipeline.
pub const DEFAULT_AIRDROP_UNITS: u64 = 2;

/// Tokens minted into the operator's account.
pub const DEFAULT_MINT_UNITS: u64 = 100;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Upper bound for one full pipeline run. Devnet confirmations are slow on a
/// bad day, but two minutes for nine steps means something is stuck.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-request HTTP timeout for JSON-RPC calls.
pub const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between two `getSignatureStatuses` polls.
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Status polls before a submitted transaction is declared unconfirmed.
pub const CONFIRMATION_MAX_ATTEMPTS: u32 = 60;

// ---------------------------------------------------------------------------
// Fee schedule (smallest units)
// ---------------------------------------------------------------------------

/// Fee charged per required signature.
pub const SIGNATURE_FEE: u64 = 5_000;

/// Rent-exempt deposit for an 82-byte mint account.
pub const MINT_RENT_EXEMPT_MINIMUM: u64 = 1_461_600;

/// Rent-exempt deposit for a 165-byte token account.
pub const TOKEN_ACCOUNT_RENT_EXEMPT_MINIMUM: u64 = 2_039_280;

/// Largest single faucet request the in-memory ledger honours, in human units.
pub const MAX_FAUCET_REQUEST_UNITS: u64 = 5;

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// Public devnet JSON-RPC endpoint.
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Public testnet JSON-RPC endpoint.
pub const TESTNET_RPC_URL: &str = "https://api.testnet.solana.com";

/// Default endpoint of a local test validator.
pub const LOCALNET_RPC_URL: &str = "http://127.0.0.1:8899";

/// Clusters that run a faucet. Mainnet does not, so it is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    Localnet,
}

impl Cluster {
    /// The cluster's public JSON-RPC URL.
    pub fn rpc_url(self) -> &'static str {
        match self {
            Cluster::Devnet => DEVNET_RPC_URL,
            Cluster::Testnet => TESTNET_RPC_URL,
            Cluster::Localnet => LOCALNET_RPC_URL,
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cluster::Devnet => write!(f, "devnet"),
            Cluster::Testnet => write!(f, "testnet"),
            Cluster::Localnet => write!(f, "localnet"),
        }
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other => Err(format!("unknown cluster '{other}' (expected devnet, testnet or localnet)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_scale_matches_decimals() {
        assert_eq!(UNIT_SCALE, 10u64.pow(UNIT_DECIMALS as u32));
        assert_eq!(TOKEN_DECIMALS as usize, UNIT_DECIMALS);
    }

    #[test]
    fn cluster_parsing() {
        assert_eq!("devnet".parse::<Cluster>().unwrap(), Cluster::Devnet);
        assert_eq!("TESTNET".parse::<Cluster>().unwrap(), Cluster::Testnet);
        assert_eq!("localhost".parse::<Cluster>().unwrap(), Cluster::Localnet);
        assert!("mainnet-beta".parse::<Cluster>().is_err());
    }

    #[test]
    fn cluster_urls_are_distinct() {
        assert_ne!(Cluster::Devnet.rpc_url(), Cluster::Testnet.rpc_url());
        assert!(Cluster::Localnet.rpc_url().starts_with("http://127.0.0.1"));
    }

    #[test]
    fn timing_constants_sanity() {
        // A run must be able to outlive at least one full confirmation wait.
        let confirmation_budget = CONFIRMATION_POLL_INTERVAL * CONFIRMATION_MAX_ATTEMPTS;
        assert!(confirmation_budget <= DEFAULT_RUN_TIMEOUT);
    }
}

//! # Ledger Client
//!
//! The pipeline never talks to the network directly. It talks to a
//! [`LedgerClient`]: seven operations covering native balances, the faucet,
//! mint creation and queries, token accounts, and minting.
//!
//! Two implementations ship with the crate:
//!
//! - [`RpcLedgerClient`]: the cluster's public JSON-RPC API over HTTP. It
//!   builds and signs the handful of transactions it needs itself
//!   (see [`transaction`] and [`programs`]).
//! - [`InMemoryLedger`]: a simulated cluster with the same fee and
//!   authority rules, plus call counters and fault injection for tests.
//!
//! ## Contract
//!
//! - Amounts are smallest units in both directions. Converting from human
//!   units is the caller's job.
//! - Anything that submits a transaction returns only after the transaction
//!   is confirmed. Submitted-but-unconfirmed is a failure.
//! - No retries, ever. A failed call is reported to the caller as-is.
//! - Implementations are `Send + Sync` and keep no per-run session state, so
//!   independent runs can share one client.

pub mod memory;
pub mod programs;
pub mod rpc;
pub mod transaction;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::Amount;
use crate::identity::{Address, Identity};

pub use memory::InMemoryLedger;
pub use rpc::{RpcConfig, RpcLedgerClient};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The request never produced a usable HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the node.
        message: String,
    },

    /// The node answered, but not with what we asked for.
    #[error("malformed response: {0}")]
    InvalidResponse(String),

    /// Submitted, but confirmation never arrived.
    #[error("transaction {signature} not confirmed after {attempts} status checks")]
    Unconfirmed {
        /// Base58 transaction signature.
        signature: String,
        /// Status polls performed.
        attempts: u32,
    },

    /// The cluster executed the transaction and it failed.
    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed {
        /// Base58 transaction signature.
        signature: String,
        /// Error reported by the cluster.
        reason: String,
    },

    /// The queried account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(Address),

    /// The payer cannot cover fees and deposits.
    #[error("insufficient funds in {address}: required {required}, available {available}")]
    InsufficientFunds {
        /// Paying account.
        address: Address,
        /// Smallest units required.
        required: u64,
        /// Smallest units available.
        available: u64,
    },

    /// A signer lacks the authority the operation needs.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The ledger refused the request for a reason of its own.
    #[error("rejected: {0}")]
    Rejected(String),

    /// A transaction could not be assembled or signed locally.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A fresh account keypair could not be generated.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Failure injected through [`InMemoryLedger::inject_fault`].
    #[error("injected fault in {0}")]
    Injected(Operation),
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Operations & commitment
// ---------------------------------------------------------------------------

/// The operations of [`LedgerClient`], used for call accounting and fault
/// injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    GetBalance,
    RequestFaucetFunds,
    CreateMint,
    GetMintSupply,
    CreateOrGetTokenAccount,
    GetAccountAmount,
    MintTo,
}

impl Operation {
    /// Every operation, in trait order.
    pub const ALL: [Operation; 7] = [
        Operation::GetBalance,
        Operation::RequestFaucetFunds,
        Operation::CreateMint,
        Operation::GetMintSupply,
        Operation::CreateOrGetTokenAccount,
        Operation::GetAccountAmount,
        Operation::MintTo,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GetBalance => "get_balance",
            Operation::RequestFaucetFunds => "request_faucet_funds",
            Operation::CreateMint => "create_mint",
            Operation::GetMintSupply => "get_mint_supply",
            Operation::CreateOrGetTokenAccount => "create_or_get_token_account",
            Operation::GetAccountAmount => "get_account_amount",
            Operation::MintTo => "mint_to",
        };
        f.write_str(name)
    }
}

/// How final a read or a confirmation must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    /// The wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// `true` if a transaction reported at `status` meets this commitment.
    pub fn is_satisfied_by(self, status: Commitment) -> bool {
        status >= self
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!("unknown commitment '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// The capability
// ---------------------------------------------------------------------------

/// Remote ledger operations consumed by the provisioning pipeline.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Native balance of `address`.
    async fn get_balance(&self, address: &Address) -> Result<Amount, LedgerError>;

    /// Requests `amount` from the faucet and waits for confirmation.
    async fn request_faucet_funds(&self, address: &Address, amount: Amount)
        -> Result<(), LedgerError>;

    /// Creates a mint paid for by `payer` and returns its address.
    async fn create_mint(
        &self,
        payer: &Identity,
        mint_authority: &Address,
        freeze_authority: Option<&Address>,
        decimals: u8,
    ) -> Result<Address, LedgerError>;

    /// Total supply of `mint`.
    async fn get_mint_supply(&self, mint: &Address) -> Result<Amount, LedgerError>;

    /// Returns the payer's associated token account for `mint`, creating it
    /// if it does not exist yet. Idempotent.
    async fn create_or_get_token_account(
        &self,
        payer: &Identity,
        mint: &Address,
    ) -> Result<Address, LedgerError>;

    /// Token balance held by `account`.
    async fn get_account_amount(&self, account: &Address) -> Result<Amount, LedgerError>;

    /// Mints `amount` of `mint` into `destination`, authorized by
    /// `mint_authority` and paid for by `payer`.
    async fn mint_to(
        &self,
        payer: &Identity,
        mint: &Address,
        destination: &Address,
        mint_authority: &Identity,
        amount: Amount,
    ) -> Result<(), LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_ordering() {
        assert!(Commitment::Confirmed.is_satisfied_by(Commitment::Finalized));
        assert!(Commitment::Confirmed.is_satisfied_by(Commitment::Confirmed));
        assert!(!Commitment::Confirmed.is_satisfied_by(Commitment::Processed));
        assert!(Commitment::Processed.is_satisfied_by(Commitment::Processed));
    }

    #[test]
    fn commitment_wire_names() {
        let json = serde_json::to_string(&Commitment::Finalized).unwrap();
        assert_eq!(json, "\"finalized\"");
        assert_eq!("CONFIRMED".parse::<Commitment>().unwrap(), Commitment::Confirmed);
        assert!("final".parse::<Commitment>().is_err());
    }

    #[test]
    fn operation_names_are_unique() {
        let mut names: Vec<String> = Operation::ALL.iter().map(|op| op.to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Operation::ALL.len());
    }
}

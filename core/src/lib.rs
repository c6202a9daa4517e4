// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Mintline Core Library
//!
//! Mintline provisions a fungible token on a remote ledger and proves that
//! it works: a fresh operator identity is funded through the faucet, a mint
//! is created, a holding account is opened, supply is minted into it, and
//! every checkpoint is reported in human units.
//!
//! None of those remote calls is interesting on its own. What matters is the
//! orchestration: each step needs the output of the one before it, every
//! step can fail, and the policy is "first failure wins, nothing is undone."
//!
//! ## Architecture
//!
//! - **config**: Unit scale, cluster endpoints, fee and timing constants.
//! - **amount**: Exact conversion between smallest units and human values.
//! - **identity**: Ed25519 identities and base58 addresses.
//! - **ledger**: The `LedgerClient` capability: a JSON-RPC adapter for real
//!   clusters and an in-memory cluster for tests and dry runs.
//! - **pipeline**: Typed steps, the provisioning context, and the executor
//!   that runs them in order and short-circuits on failure.
//! - **report**: Checkpoint rendering and post-mint sanity assertions.
//! - **error**: The step-level error taxonomy.

pub mod amount;
pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod pipeline;
pub mod report;

pub use amount::Amount;
pub use error::ProvisionError;
pub use identity::{generate_identity, Address, Identity};
pub use ledger::{InMemoryLedger, LedgerClient, LedgerError, RpcLedgerClient};
pub use pipeline::{Executor, Pipeline, ProvisioningContext, StepFailure, StepName};
pub use report::Reporter;

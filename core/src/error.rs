//! Step-level errors.
//!
//! Every failure the executor can report is a [`ProvisionError`]. Each
//! variant names the step it happened at, and the collaborator variants wrap
//! the [`LedgerError`] that caused them. The step is kept out of the message
//! so that reports can place it themselves. Nothing here is ever retried.

use std::time::Duration;

use thiserror::Error;

use crate::identity::IdentityError;
use crate::ledger::LedgerError;
use crate::pipeline::StepName;

/// Errors that abort a provisioning run.
#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    /// A balance, supply, or amount query failed.
    #[error("query failed: {source}")]
    Query {
        /// Step that issued the query.
        step: StepName,
        /// Underlying ledger failure.
        #[source]
        source: LedgerError,
    },

    /// The faucet request failed or was never confirmed.
    #[error("faucet request failed: {source}")]
    Faucet {
        /// Step that requested funds.
        step: StepName,
        /// Underlying ledger failure.
        #[source]
        source: LedgerError,
    },

    /// The mint could not be created.
    #[error("mint creation failed: {source}")]
    MintCreation {
        /// Step that created the mint.
        step: StepName,
        /// Underlying ledger failure.
        #[source]
        source: LedgerError,
    },

    /// The token account could not be created or looked up.
    #[error("token account creation failed: {source}")]
    AccountCreation {
        /// Step that created the account.
        step: StepName,
        /// Underlying ledger failure.
        #[source]
        source: LedgerError,
    },

    /// Minting into the token account failed.
    #[error("minting failed: {source}")]
    MintTransfer {
        /// Step that minted.
        step: StepName,
        /// Underlying ledger failure.
        #[source]
        source: LedgerError,
    },

    /// The run deadline expired while this step was executing.
    #[error("run timed out after {limit:?}")]
    Timeout {
        /// Step that was executing.
        step: StepName,
        /// Configured run limit.
        limit: Duration,
    },

    /// An authority identity could not be generated.
    #[error("identity generation failed: {source}")]
    Identity {
        /// Step that needed the identity.
        step: StepName,
        /// Underlying entropy failure.
        #[source]
        source: IdentityError,
    },

    /// The step needs a value an earlier step should have produced.
    #[error("missing {missing}; an earlier step has not run")]
    OutOfOrder {
        /// Step that found the gap.
        step: StepName,
        /// Name of the absent context field.
        missing: &'static str,
    },

    /// A post-step sanity check failed.
    #[error("invariant violated: {detail}")]
    Invariant {
        /// Step whose result failed the check.
        step: StepName,
        /// What was expected and what was observed.
        detail: String,
    },
}

impl ProvisionError {
    /// The step the error is attributed to.
    pub fn step(&self) -> StepName {
        match self {
            ProvisionError::Query { step, .. }
            | ProvisionError::Faucet { step, .. }
            | ProvisionError::MintCreation { step, .. }
            | ProvisionError::AccountCreation { step, .. }
            | ProvisionError::MintTransfer { step, .. }
            | ProvisionError::Timeout { step, .. }
            | ProvisionError::Identity { step, .. }
            | ProvisionError::OutOfOrder { step, .. }
            | ProvisionError::Invariant { step, .. } => *step,
        }
    }

    /// The collaborator error behind this failure, if it came from the ledger.
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            ProvisionError::Query { source, .. }
            | ProvisionError::Faucet { source, .. }
            | ProvisionError::MintCreation { source, .. }
            | ProvisionError::AccountCreation { source, .. }
            | ProvisionError::MintTransfer { source, .. } => Some(source),
            _ => None,
        }
    }
}

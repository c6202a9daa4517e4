//! # Provisioning Steps
//!
//! A step is one ledger call plus the context fields it fills in. Steps never
//! mutate the context they are given; they return a new one or an error.
//!
//! | Step                 | Ledger call                   | Produces                 | State            |
//! |----------------------|-------------------------------|--------------------------|------------------|
//! | [`FundOperator`]     | `request_faucet_funds`        | nothing                  | `Funding`, `Funded` |
//! | [`QueryBalance`]     | `get_balance`                 | balance                  | unchanged        |
//! | [`CreateMint`]       | `create_mint`                 | mint, authorities        | `MintCreated`    |
//! | [`QueryMintSupply`]  | `get_mint_supply`             | supply                   | unchanged        |
//! | [`CreateTokenAccount`] | `create_or_get_token_account` | token account          | `AccountCreated` |
//! | [`QueryAccountAmount`] | `get_account_amount`        | account amount           | unchanged        |
//! | [`MintTokens`]       | `mint_to`                     | last minted amount       | `Minted`         |

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::{ProvisioningContext, RunState};
use crate::amount::Amount;
use crate::error::ProvisionError;
use crate::identity::Identity;
use crate::ledger::LedgerClient;

// ---------------------------------------------------------------------------
// Step names
// ---------------------------------------------------------------------------

/// Identifies a step in reports and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepName {
    /// Faucet request for the operator.
    Funding,
    /// Native balance query.
    QueryBalance,
    /// Mint creation.
    CreateMint,
    /// Mint supply query.
    QueryMintSupply,
    /// Token account creation or lookup.
    CreateTokenAccount,
    /// Token account amount query.
    QueryAccountAmount,
    /// Minting into the token account.
    MintTokens,
}

impl StepName {
    /// The name as it appears in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            StepName::Funding => "Funding",
            StepName::QueryBalance => "QueryBalance",
            StepName::CreateMint => "CreateMint",
            StepName::QueryMintSupply => "QueryMintSupply",
            StepName::CreateTokenAccount => "CreateTokenAccount",
            StepName::QueryAccountAmount => "QueryAccountAmount",
            StepName::MintTokens => "MintTokens",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// The trait
// ---------------------------------------------------------------------------

/// One unit of provisioning work.
#[async_trait]
pub trait ProvisioningStep: Send + Sync {
    /// Name used in reports and errors.
    fn name(&self) -> StepName;

    /// State the run is in while this step executes. The executor applies it
    /// before calling [`run`](Self::run), so a failure is reported in it.
    fn in_flight_state(&self) -> Option<RunState> {
        None
    }

    /// Performs the step's ledger call and returns the extended context.
    async fn run(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &ProvisioningContext,
    ) -> Result<ProvisioningContext, ProvisionError>;
}

fn require<T>(value: Option<T>, step: StepName, missing: &'static str) -> Result<T, ProvisionError> {
    value.ok_or(ProvisionError::OutOfOrder { step, missing })
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Requests a fixed amount from the faucet for the operator.
#[derive(Debug, Clone, Copy)]
pub struct FundOperator {
    /// Quantity requested from the faucet.
    pub amount: Amount,
}

#[async_trait]
impl ProvisioningStep for FundOperator {
    fn name(&self) -> StepName {
        StepName::Funding
    }

    fn in_flight_state(&self) -> Option<RunState> {
        Some(RunState::Funding)
    }

    async fn run(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &ProvisioningContext,
    ) -> Result<ProvisioningContext, ProvisionError> {
        let step = self.name();
        ledger
            .request_faucet_funds(&ctx.operator_address(), self.amount)
            .await
            .map_err(|source| ProvisionError::Faucet { step, source })?;
        let state = ctx.state().max(RunState::Funded);
        Ok(ctx.clone().with_state(state))
    }
}

/// Reads the operator's native balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBalance;

#[async_trait]
impl ProvisioningStep for QueryBalance {
    fn name(&self) -> StepName {
        StepName::QueryBalance
    }

    async fn run(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &ProvisioningContext,
    ) -> Result<ProvisioningContext, ProvisionError> {
        let step = self.name();
        let balance = ledger
            .get_balance(&ctx.operator_address())
            .await
            .map_err(|source| ProvisionError::Query { step, source })?;
        Ok(ctx.clone().with_balance(balance))
    }
}

/// Creates a mint paid for by the operator, under freshly generated mint
/// and freeze authorities.
#[derive(Debug, Clone, Copy)]
pub struct CreateMint {
    /// Decimal places of the new mint.
    pub decimals: u8,
}

#[async_trait]
impl ProvisioningStep for CreateMint {
    fn name(&self) -> StepName {
        StepName::CreateMint
    }

    async fn run(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &ProvisioningContext,
    ) -> Result<ProvisioningContext, ProvisionError> {
        let step = self.name();
        let identity = |source| ProvisionError::Identity { step, source };
        let mint_authority = Identity::generate().map_err(identity)?;
        let freeze_authority = Identity::generate().map_err(identity)?.address();

        let mint = ledger
            .create_mint(
                ctx.operator(),
                &mint_authority.address(),
                Some(&freeze_authority),
                self.decimals,
            )
            .await
            .map_err(|source| ProvisionError::MintCreation { step, source })?;
        debug!(%mint, mint_authority = %mint_authority.address(), "mint recorded");

        Ok(ctx
            .clone()
            .with_mint(mint, Arc::new(mint_authority), Some(freeze_authority))
            .with_state(RunState::MintCreated))
    }
}

/// Reads the total supply of the run's mint.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryMintSupply;

#[async_trait]
impl ProvisioningStep for QueryMintSupply {
    fn name(&self) -> StepName {
        StepName::QueryMintSupply
    }

    async fn run(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &ProvisioningContext,
    ) -> Result<ProvisioningContext, ProvisionError> {
        let step = self.name();
        let mint = require(ctx.mint(), step, "mint")?;
        let supply = ledger
            .get_mint_supply(&mint)
            .await
            .map_err(|source| ProvisionError::Query { step, source })?;
        Ok(ctx.clone().with_mint_supply(supply))
    }
}

/// Creates (or finds) the operator's token account for the run's mint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateTokenAccount;

#[async_trait]
impl ProvisioningStep for CreateTokenAccount {
    fn name(&self) -> StepName {
        StepName::CreateTokenAccount
    }

    async fn run(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &ProvisioningContext,
    ) -> Result<ProvisioningContext, ProvisionError> {
        let step = self.name();
        let mint = require(ctx.mint(), step, "mint")?;
        let account = ledger
            .create_or_get_token_account(ctx.operator(), &mint)
            .await
            .map_err(|source| ProvisionError::AccountCreation { step, source })?;
        Ok(ctx
            .clone()
            .with_token_account(account)
            .with_state(RunState::AccountCreated))
    }
}

/// Reads the token account's balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAccountAmount;

#[async_trait]
impl ProvisioningStep for QueryAccountAmount {
    fn name(&self) -> StepName {
        StepName::QueryAccountAmount
    }

    async fn run(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &ProvisioningContext,
    ) -> Result<ProvisioningContext, ProvisionError> {
        let step = self.name();
        let account = require(ctx.token_account(), step, "token account")?;
        let amount = ledger
            .get_account_amount(&account)
            .await
            .map_err(|source| ProvisionError::Query { step, source })?;
        Ok(ctx.clone().with_account_amount(amount))
    }
}

/// Mints a fixed amount into the token account, signed by the mint
/// authority and paid for by the operator.
#[derive(Debug, Clone, Copy)]
pub struct MintTokens {
    /// Quantity minted into the operator's token account.
    pub amount: Amount,
}

#[async_trait]
impl ProvisioningStep for MintTokens {
    fn name(&self) -> StepName {
        StepName::MintTokens
    }

    async fn run(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &ProvisioningContext,
    ) -> Result<ProvisioningContext, ProvisionError> {
        let step = self.name();
        let mint = require(ctx.mint(), step, "mint")?;
        let account = require(ctx.token_account(), step, "token account")?;
        let authority = require(ctx.mint_authority(), step, "mint authority")?;

        ledger
            .mint_to(ctx.operator(), &mint, &account, authority, self.amount)
            .await
            .map_err(|source| ProvisionError::MintTransfer { step, source })?;
        Ok(ctx
            .clone()
            .with_last_minted(self.amount)
            .with_state(RunState::Minted))
    }
}

//! The value threaded through a provisioning run.
//!
//! A [`ProvisioningContext`] only grows. Steps read it by reference and hand
//! back a new one built with the consuming `with_*` methods, so the context a
//! failing step was given is still intact afterwards.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::Amount;
use crate::identity::{Address, Identity};

/// How far a run has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// Nothing has happened on the ledger yet.
    Start,
    /// A faucet request for the operator is in flight.
    Funding,
    /// The operator received faucet funds.
    Funded,
    /// A mint exists.
    MintCreated,
    /// The operator holds a token account for the mint.
    AccountCreated,
    /// Supply was minted into the token account.
    Minted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "Start",
            RunState::Funding => "Funding",
            RunState::Funded => "Funded",
            RunState::MintCreated => "MintCreated",
            RunState::AccountCreated => "AccountCreated",
            RunState::Minted => "Minted",
        };
        f.write_str(name)
    }
}

/// Everything a run has learned so far. `None` means the producing step has
/// not run; `Some` is the last observed value.
#[derive(Debug, Clone)]
pub struct ProvisioningContext {
    run_id: Uuid,
    operator: Arc<Identity>,
    operator_address: Address,
    state: RunState,
    balance: Option<Amount>,
    mint: Option<Address>,
    mint_authority: Option<Arc<Identity>>,
    freeze_authority: Option<Address>,
    token_account: Option<Address>,
    account_amount: Option<Amount>,
    mint_supply: Option<Amount>,
    last_minted: Option<Amount>,
}

impl ProvisioningContext {
    /// A fresh context owned by `operator`, with a new run id.
    pub fn new(operator: Identity) -> Self {
        Self::shared(Arc::new(operator))
    }

    /// Like [`new`](Self::new) for an identity that is already shared.
    pub fn shared(operator: Arc<Identity>) -> Self {
        let operator_address = operator.address();
        Self {
            run_id: Uuid::new_v4(),
            operator,
            operator_address,
            state: RunState::Start,
            balance: None,
            mint: None,
            mint_authority: None,
            freeze_authority: None,
            token_account: None,
            account_amount: None,
            mint_supply: None,
            last_minted: None,
        }
    }

    // ---- Accessors ----

    /// Identifier shared by every checkpoint of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The identity paying for and owning everything the run creates.
    pub fn operator(&self) -> &Identity {
        &self.operator
    }

    /// Address of [`operator`](Self::operator).
    pub fn operator_address(&self) -> Address {
        self.operator_address
    }

    /// How far the run has progressed.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Operator's native balance at the last balance query.
    pub fn balance(&self) -> Option<Amount> {
        self.balance
    }

    /// The mint created by this run.
    pub fn mint(&self) -> Option<Address> {
        self.mint
    }

    /// Identity allowed to mint into [`mint`](Self::mint).
    pub fn mint_authority(&self) -> Option<&Identity> {
        self.mint_authority.as_deref()
    }

    /// Address of the mint authority.
    pub fn mint_authority_address(&self) -> Option<Address> {
        self.mint_authority.as_ref().map(|id| id.address())
    }

    /// Freeze authority the mint was created with, if any.
    pub fn freeze_authority(&self) -> Option<Address> {
        self.freeze_authority
    }

    /// Operator's token account for the mint.
    pub fn token_account(&self) -> Option<Address> {
        self.token_account
    }

    /// Token account balance at the last amount query.
    pub fn account_amount(&self) -> Option<Amount> {
        self.account_amount
    }

    /// Mint supply at the last supply query.
    pub fn mint_supply(&self) -> Option<Amount> {
        self.mint_supply
    }

    /// Amount minted by the most recent mint step.
    pub fn last_minted(&self) -> Option<Amount> {
        self.last_minted
    }

    // ---- Builders ----

    /// Moves the run to `state`.
    pub fn with_state(mut self, state: RunState) -> Self {
        self.state = state;
        self
    }

    /// Records a balance query result.
    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Records a new mint and the authorities it was created with.
    pub fn with_mint(
        mut self,
        mint: Address,
        mint_authority: Arc<Identity>,
        freeze_authority: Option<Address>,
    ) -> Self {
        self.mint = Some(mint);
        self.mint_authority = Some(mint_authority);
        self.freeze_authority = freeze_authority;
        self
    }

    /// Records a supply query result.
    pub fn with_mint_supply(mut self, supply: Amount) -> Self {
        self.mint_supply = Some(supply);
        self
    }

    /// Records the operator's token account.
    pub fn with_token_account(mut self, account: Address) -> Self {
        self.token_account = Some(account);
        self
    }

    /// Records an account amount query result.
    pub fn with_account_amount(mut self, amount: Amount) -> Self {
        self.account_amount = Some(amount);
        self
    }

    /// Records the amount just minted.
    pub fn with_last_minted(mut self, amount: Amount) -> Self {
        self.last_minted = Some(amount);
        self
    }
}

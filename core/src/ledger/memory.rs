//! Simulated cluster.
//!
//! [`InMemoryLedger`] keeps lamport balances, mints, and token accounts in a
//! single `parking_lot::Mutex`. It applies the same rules the real cluster
//! enforces on the provisioning path:
//!
//! - payers are charged one signature fee per signer plus rent deposits for
//!   new accounts, and are rejected when they cannot cover them;
//! - faucet requests above [`MAX_FAUCET_REQUEST_UNITS`] are refused;
//! - `mint_to` requires the mint authority and a destination of the same mint;
//! - supply and balances never overflow.
//!
//! ## Test hooks
//!
//! - [`call_count`](InMemoryLedger::call_count) counts every invocation,
//!   including failed ones.
//! - [`inject_fault`](InMemoryLedger::inject_fault) makes an operation fail
//!   with [`LedgerError::Injected`] until [`clear_faults`](InMemoryLedger::clear_faults).
//! - [`set_unconfirmed_faucet`](InMemoryLedger::set_unconfirmed_faucet)
//!   accepts faucet requests without ever confirming them.
//! - [`with_latency`](InMemoryLedger::with_latency) delays every call, for
//!   timeout tests under a paused clock.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::programs::associated_token_address;
use super::{LedgerClient, LedgerError, Operation};
use crate::amount::Amount;
use crate::config::{
    CONFIRMATION_MAX_ATTEMPTS, MAX_FAUCET_REQUEST_UNITS, MINT_RENT_EXEMPT_MINIMUM, SIGNATURE_FEE,
    TOKEN_ACCOUNT_RENT_EXEMPT_MINIMUM, UNIT_SCALE,
};
use crate::identity::{Address, Identity};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Point-in-time view of a simulated mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSnapshot {
    /// Decimal places.
    pub decimals: u8,
    /// Total supply in base units.
    pub supply: u64,
    /// Address allowed to mint.
    pub mint_authority: Address,
    /// Address allowed to freeze accounts, if any.
    pub freeze_authority: Option<Address>,
}

#[derive(Debug, Clone)]
struct TokenAccountRecord {
    mint: Address,
    owner: Address,
    amount: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<Address, u64>,
    mints: HashMap<Address, MintSnapshot>,
    token_accounts: HashMap<Address, TokenAccountRecord>,
    calls: HashMap<Operation, u64>,
    faults: HashSet<Operation>,
    unconfirmed_faucet: bool,
    next_signature: u64,
}

impl LedgerState {
    fn charge(&mut self, payer: &Address, cost: u64) -> Result<(), LedgerError> {
        let available = self.balances.get(payer).copied().unwrap_or(0);
        let remaining = available
            .checked_sub(cost)
            .ok_or(LedgerError::InsufficientFunds {
                address: *payer,
                required: cost,
                available,
            })?;
        self.balances.insert(*payer, remaining);
        Ok(())
    }

    fn signature(&mut self) -> String {
        self.next_signature += 1;
        let mut raw = [0u8; 64];
        raw[..8].copy_from_slice(&self.next_signature.to_be_bytes());
        bs58::encode(raw).into_string()
    }
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

/// Deterministic, thread-safe stand-in for a cluster.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    latency: Option<Duration>,
}

impl InMemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Credits `amount` directly, bypassing the faucet cap. Not counted as a
    /// call.
    pub fn credit(&self, address: &Address, amount: Amount) {
        let mut state = self.state.lock();
        let balance = state.balances.entry(*address).or_insert(0);
        *balance = balance.saturating_add(amount.smallest());
    }

    /// Makes `op` fail until faults are cleared.
    pub fn inject_fault(&self, op: Operation) {
        self.state.lock().faults.insert(op);
    }

    /// Removes every injected fault.
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// When enabled, faucet requests are accepted but never confirmed and
    /// nothing is credited.
    pub fn set_unconfirmed_faucet(&self, enabled: bool) {
        self.state.lock().unconfirmed_faucet = enabled;
    }

    /// Number of times `op` was invoked.
    pub fn call_count(&self, op: Operation) -> u64 {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total invocations across all operations.
    pub fn total_calls(&self) -> u64 {
        self.state.lock().calls.values().sum()
    }

    /// Current state of `mint`.
    pub fn mint(&self, mint: &Address) -> Option<MintSnapshot> {
        self.state.lock().mints.get(mint).cloned()
    }

    /// Owner of a token account.
    pub fn token_account_owner(&self, account: &Address) -> Option<Address> {
        self.state.lock().token_accounts.get(account).map(|a| a.owner)
    }

    /// Counts the call, applies latency, and fails if a fault is injected.
    async fn enter(&self, op: Operation) -> Result<(), LedgerError> {
        self.state.lock().calls.entry(op).and_modify(|n| *n += 1).or_insert(1);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.state.lock().faults.contains(&op) {
            debug!(%op, "injected fault");
            return Err(LedgerError::Injected(op));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn get_balance(&self, address: &Address) -> Result<Amount, LedgerError> {
        self.enter(Operation::GetBalance).await?;
        let state = self.state.lock();
        Ok(Amount::from_smallest(
            state.balances.get(address).copied().unwrap_or(0),
        ))
    }

    async fn request_faucet_funds(&self, address: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.enter(Operation::RequestFaucetFunds).await?;
        let cap = MAX_FAUCET_REQUEST_UNITS * UNIT_SCALE;
        if amount == Amount::ZERO {
            return Err(LedgerError::Rejected("faucet request must be positive".into()));
        }
        if amount.smallest() > cap {
            return Err(LedgerError::Rejected(format!(
                "faucet request of {} exceeds the {MAX_FAUCET_REQUEST_UNITS} unit limit",
                amount.to_human()
            )));
        }

        let mut state = self.state.lock();
        let signature = state.signature();
        if state.unconfirmed_faucet {
            return Err(LedgerError::Unconfirmed {
                signature,
                attempts: CONFIRMATION_MAX_ATTEMPTS,
            });
        }
        let balance = state.balances.entry(*address).or_insert(0);
        *balance = balance
            .checked_add(amount.smallest())
            .ok_or_else(|| LedgerError::Rejected(format!("balance of {address} would overflow")))?;
        debug!(%address, lamports = amount.smallest(), %signature, "faucet funds credited");
        Ok(())
    }

    async fn create_mint(
        &self,
        payer: &Identity,
        mint_authority: &Address,
        freeze_authority: Option<&Address>,
        decimals: u8,
    ) -> Result<Address, LedgerError> {
        self.enter(Operation::CreateMint).await?;
        let mint = Identity::generate()
            .map_err(|e| LedgerError::KeyGeneration(e.to_string()))?
            .address();

        let mut state = self.state.lock();
        // Payer and the new mint account both sign.
        state.charge(&payer.address(), 2 * SIGNATURE_FEE + MINT_RENT_EXEMPT_MINIMUM)?;
        state.mints.insert(
            mint,
            MintSnapshot {
                decimals,
                supply: 0,
                mint_authority: *mint_authority,
                freeze_authority: freeze_authority.copied(),
            },
        );
        debug!(%mint, decimals, "mint created");
        Ok(mint)
    }

    async fn get_mint_supply(&self, mint: &Address) -> Result<Amount, LedgerError> {
        self.enter(Operation::GetMintSupply).await?;
        let state = self.state.lock();
        state
            .mints
            .get(mint)
            .map(|m| Amount::from_smallest(m.supply))
            .ok_or(LedgerError::AccountNotFound(*mint))
    }

    async fn create_or_get_token_account(
        &self,
        payer: &Identity,
        mint: &Address,
    ) -> Result<Address, LedgerError> {
        self.enter(Operation::CreateOrGetTokenAccount).await?;
        let owner = payer.address();
        let account = associated_token_address(&owner, mint)
            .ok_or_else(|| LedgerError::Rejected(format!("no associated address for {owner}")))?;

        let mut state = self.state.lock();
        if !state.mints.contains_key(mint) {
            return Err(LedgerError::AccountNotFound(*mint));
        }
        if state.token_accounts.contains_key(&account) {
            return Ok(account);
        }
        state.charge(&owner, SIGNATURE_FEE + TOKEN_ACCOUNT_RENT_EXEMPT_MINIMUM)?;
        state.token_accounts.insert(
            account,
            TokenAccountRecord {
                mint: *mint,
                owner,
                amount: 0,
            },
        );
        debug!(%account, %mint, "token account created");
        Ok(account)
    }

    async fn get_account_amount(&self, account: &Address) -> Result<Amount, LedgerError> {
        self.enter(Operation::GetAccountAmount).await?;
        let state = self.state.lock();
        state
            .token_accounts
            .get(account)
            .map(|a| Amount::from_smallest(a.amount))
            .ok_or(LedgerError::AccountNotFound(*account))
    }

    async fn mint_to(
        &self,
        payer: &Identity,
        mint: &Address,
        destination: &Address,
        mint_authority: &Identity,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.enter(Operation::MintTo).await?;
        let payer_address = payer.address();
        let authority = mint_authority.address();
        let fee = if payer_address == authority {
            SIGNATURE_FEE
        } else {
            2 * SIGNATURE_FEE
        };

        let mut state = self.state.lock();
        let record = state.mints.get(mint).ok_or(LedgerError::AccountNotFound(*mint))?;
        if record.mint_authority != authority {
            return Err(LedgerError::Unauthorized(format!(
                "{authority} is not the mint authority of {mint}"
            )));
        }
        let new_supply = record
            .supply
            .checked_add(amount.smallest())
            .ok_or_else(|| LedgerError::Rejected(format!("supply of {mint} would overflow")))?;

        let target = state
            .token_accounts
            .get(destination)
            .ok_or(LedgerError::AccountNotFound(*destination))?;
        if target.mint != *mint {
            return Err(LedgerError::Rejected(format!(
                "{destination} holds {}, not {mint}",
                target.mint
            )));
        }
        let new_amount = target
            .amount
            .checked_add(amount.smallest())
            .ok_or_else(|| LedgerError::Rejected(format!("amount in {destination} would overflow")))?;

        state.charge(&payer_address, fee)?;
        if let Some(record) = state.mints.get_mut(mint) {
            record.supply = new_supply;
        }
        if let Some(target) = state.token_accounts.get_mut(destination) {
            target.amount = new_amount;
        }
        debug!(%mint, %destination, amount = amount.smallest(), "minted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: u64) -> Amount {
        Amount::from_units(n).unwrap()
    }

    fn funded(ledger: &InMemoryLedger, seed: u8) -> Identity {
        let id = Identity::from_seed(&[seed; 32]);
        ledger.credit(&id.address(), units(1));
        id
    }

    #[tokio::test]
    async fn unknown_address_has_zero_balance() {
        let ledger = InMemoryLedger::new();
        let balance = ledger.get_balance(&Address::new([4; 32])).await.unwrap();
        assert_eq!(balance, Amount::ZERO);
        assert_eq!(ledger.call_count(Operation::GetBalance), 1);
    }

    #[tokio::test]
    async fn faucet_credits_and_caps() {
        let ledger = InMemoryLedger::new();
        let addr = Address::new([1; 32]);
        ledger.request_faucet_funds(&addr, units(2)).await.unwrap();
        assert_eq!(ledger.get_balance(&addr).await.unwrap(), units(2));

        let err = ledger.request_faucet_funds(&addr, units(6)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        let err = ledger.request_faucet_funds(&addr, Amount::ZERO).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        assert_eq!(ledger.call_count(Operation::RequestFaucetFunds), 3);
    }

    #[tokio::test]
    async fn unconfirmed_faucet_credits_nothing() {
        let ledger = InMemoryLedger::new();
        ledger.set_unconfirmed_faucet(true);
        let addr = Address::new([1; 32]);
        let err = ledger.request_faucet_funds(&addr, units(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unconfirmed { .. }));
        assert_eq!(ledger.get_balance(&addr).await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn create_mint_charges_fees_and_rent() {
        let ledger = InMemoryLedger::new();
        let payer = funded(&ledger, 1);
        let freeze = Address::new([9; 32]);
        let mint = ledger
            .create_mint(&payer, &payer.address(), Some(&freeze), 9)
            .await
            .unwrap();

        let snapshot = ledger.mint(&mint).unwrap();
        assert_eq!(snapshot.supply, 0);
        assert_eq!(snapshot.decimals, 9);
        assert_eq!(snapshot.freeze_authority, Some(freeze));
        let balance = ledger.get_balance(&payer.address()).await.unwrap();
        assert_eq!(
            balance.smallest(),
            UNIT_SCALE - 2 * SIGNATURE_FEE - MINT_RENT_EXEMPT_MINIMUM
        );
    }

    #[tokio::test]
    async fn unfunded_payer_cannot_create_mint() {
        let ledger = InMemoryLedger::new();
        let payer = Identity::from_seed(&[1; 32]);
        let err = ledger
            .create_mint(&payer, &payer.address(), None, 9)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available: 0, .. }));
    }

    #[tokio::test]
    async fn token_account_is_idempotent_and_charged_once() {
        let ledger = InMemoryLedger::new();
        let payer = funded(&ledger, 1);
        let mint = ledger.create_mint(&payer, &payer.address(), None, 9).await.unwrap();
        let after_mint = ledger.get_balance(&payer.address()).await.unwrap();

        let first = ledger.create_or_get_token_account(&payer, &mint).await.unwrap();
        let second = ledger.create_or_get_token_account(&payer, &mint).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.token_account_owner(&first), Some(payer.address()));

        let after_accounts = ledger.get_balance(&payer.address()).await.unwrap();
        assert_eq!(
            after_mint.smallest() - after_accounts.smallest(),
            SIGNATURE_FEE + TOKEN_ACCOUNT_RENT_EXEMPT_MINIMUM
        );
        assert_eq!(ledger.get_account_amount(&first).await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn token_account_requires_existing_mint() {
        let ledger = InMemoryLedger::new();
        let payer = funded(&ledger, 1);
        let missing = Address::new([7; 32]);
        let err = ledger.create_or_get_token_account(&payer, &missing).await.unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound(missing));
    }

    #[tokio::test]
    async fn mint_to_updates_supply_and_amount() {
        let ledger = InMemoryLedger::new();
        let payer = funded(&ledger, 1);
        let authority = Identity::from_seed(&[2; 32]);
        let mint = ledger.create_mint(&payer, &authority.address(), None, 9).await.unwrap();
        let account = ledger.create_or_get_token_account(&payer, &mint).await.unwrap();

        ledger.mint_to(&payer, &mint, &account, &authority, units(100)).await.unwrap();
        assert_eq!(ledger.get_mint_supply(&mint).await.unwrap(), units(100));
        assert_eq!(ledger.get_account_amount(&account).await.unwrap(), units(100));
    }

    #[tokio::test]
    async fn mint_to_rejects_wrong_authority() {
        let ledger = InMemoryLedger::new();
        let payer = funded(&ledger, 1);
        let mint = ledger.create_mint(&payer, &payer.address(), None, 9).await.unwrap();
        let account = ledger.create_or_get_token_account(&payer, &mint).await.unwrap();
        let impostor = Identity::from_seed(&[3; 32]);

        let err = ledger
            .mint_to(&payer, &mint, &account, &impostor, units(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
        assert_eq!(ledger.get_mint_supply(&mint).await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn mint_to_rejects_account_of_other_mint() {
        let ledger = InMemoryLedger::new();
        let payer = funded(&ledger, 1);
        let mint_a = ledger.create_mint(&payer, &payer.address(), None, 9).await.unwrap();
        let mint_b = ledger.create_mint(&payer, &payer.address(), None, 9).await.unwrap();
        let account_b = ledger.create_or_get_token_account(&payer, &mint_b).await.unwrap();

        let err = ledger
            .mint_to(&payer, &mint_a, &account_b, &payer, units(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
    }

    #[tokio::test]
    async fn mint_to_rejects_overflow() {
        let ledger = InMemoryLedger::new();
        let payer = funded(&ledger, 1);
        let mint = ledger.create_mint(&payer, &payer.address(), None, 9).await.unwrap();
        let account = ledger.create_or_get_token_account(&payer, &mint).await.unwrap();
        let max = Amount::from_smallest(u64::MAX);

        ledger.mint_to(&payer, &mint, &account, &payer, max).await.unwrap();
        let err = ledger
            .mint_to(&payer, &mint, &account, &payer, Amount::from_smallest(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        assert_eq!(ledger.get_mint_supply(&mint).await.unwrap(), max);
    }

    #[tokio::test]
    async fn injected_faults_persist_until_cleared() {
        let ledger = InMemoryLedger::new();
        let addr = Address::new([1; 32]);
        ledger.inject_fault(Operation::GetBalance);

        for _ in 0..2 {
            assert_eq!(
                ledger.get_balance(&addr).await.unwrap_err(),
                LedgerError::Injected(Operation::GetBalance)
            );
        }
        ledger.clear_faults();
        assert!(ledger.get_balance(&addr).await.is_ok());
        assert_eq!(ledger.call_count(Operation::GetBalance), 3);
        assert_eq!(ledger.total_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_calls() {
        let ledger = InMemoryLedger::new().with_latency(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        ledger.get_balance(&Address::new([1; 32])).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}

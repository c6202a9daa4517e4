//! Ordered step lists and the two stock pipelines.

use crate::amount::Amount;
use crate::config::{
    DEFAULT_AIRDROP_UNITS, DEFAULT_FUND_UNITS, DEFAULT_MINT_UNITS, TOKEN_DECIMALS, UNIT_SCALE,
};

use super::step::{
    CreateMint, CreateTokenAccount, FundOperator, MintTokens, ProvisioningStep, QueryAccountAmount,
    QueryBalance, QueryMintSupply, StepName,
};

/// Parameters of the token provisioning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPlan {
    /// Faucet request for the operator.
    pub fund: Amount,
    /// Decimals of the new mint.
    pub decimals: u8,
    /// Supply minted into the operator's account.
    pub mint: Amount,
}

impl Default for TokenPlan {
    fn default() -> Self {
        Self {
            fund: Amount::from_smallest(DEFAULT_FUND_UNITS * UNIT_SCALE),
            decimals: TOKEN_DECIMALS,
            mint: Amount::from_smallest(DEFAULT_MINT_UNITS * UNIT_SCALE),
        }
    }
}

/// The default airdrop quantity.
pub fn default_airdrop() -> Amount {
    Amount::from_smallest(DEFAULT_AIRDROP_UNITS * UNIT_SCALE)
}

/// Steps run in insertion order.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn ProvisioningStep>>,
}

impl Pipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn then(mut self, step: impl ProvisioningStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// The steps, in execution order.
    pub fn steps(&self) -> &[Box<dyn ProvisioningStep>] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// `true` if there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Fund, create a mint and an account, mint into it, and observe every
    /// value before and after.
    pub fn token_provisioning(plan: &TokenPlan) -> Self {
        Self::new()
            .then(FundOperator { amount: plan.fund })
            .then(QueryBalance)
            .then(CreateMint {
                decimals: plan.decimals,
            })
            .then(QueryMintSupply)
            .then(CreateTokenAccount)
            .then(QueryAccountAmount)
            .then(MintTokens { amount: plan.mint })
            .then(QueryMintSupply)
            .then(QueryAccountAmount)
    }

    /// Balance, faucet request, balance.
    pub fn airdrop(amount: Amount) -> Self {
        Self::new()
            .then(QueryBalance)
            .then(FundOperator { amount })
            .then(QueryBalance)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pipeline_order() {
        let pipeline = Pipeline::token_provisioning(&TokenPlan::default());
        assert_eq!(
            pipeline.step_names(),
            vec![
                StepName::Funding,
                StepName::QueryBalance,
                StepName::CreateMint,
                StepName::QueryMintSupply,
                StepName::CreateTokenAccount,
                StepName::QueryAccountAmount,
                StepName::MintTokens,
                StepName::QueryMintSupply,
                StepName::QueryAccountAmount,
            ]
        );
    }

    #[test]
    fn airdrop_pipeline_order() {
        let pipeline = Pipeline::airdrop(default_airdrop());
        assert_eq!(
            pipeline.step_names(),
            vec![StepName::QueryBalance, StepName::Funding, StepName::QueryBalance]
        );
    }

    #[test]
    fn default_plan_values() {
        let plan = TokenPlan::default();
        assert_eq!(plan.fund.to_human(), "1");
        assert_eq!(plan.mint.to_human(), "100");
        assert_eq!(plan.decimals, 9);
        assert_eq!(default_airdrop().to_human(), "2");
    }

    #[test]
    fn empty_pipeline() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(format!("{pipeline:?}"), "[]");
    }
}

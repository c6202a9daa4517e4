//! # Provisioning Pipeline
//!
//! Typed steps over a growing context, run in order by an executor that
//! stops at the first failure.
//!
//! - [`context`]: [`ProvisioningContext`] and the [`RunState`] it carries.
//! - [`step`]: the [`ProvisioningStep`] trait and the seven steps.
//! - [`plan`]: [`Pipeline`] and the stock token and airdrop pipelines.
//! - [`executor`]: [`Executor`], [`StepFailure`], and observer hooks.

pub mod context;
pub mod executor;
pub mod plan;
pub mod step;

pub use context::{ProvisioningContext, RunState};
pub use executor::{Executor, NoopObserver, PipelineObserver, StepFailure};
pub use plan::{default_airdrop, Pipeline, TokenPlan};
pub use step::{
    CreateMint, CreateTokenAccount, FundOperator, MintTokens, ProvisioningStep, QueryAccountAmount,
    QueryBalance, QueryMintSupply, StepName,
};

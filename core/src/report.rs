//! # Reporter
//!
//! Turns a run into checkpoints: one line per completed step with the value
//! it observed in human units, one line for the failure if there is one, and
//! a final summary. Lines are plain text or JSON, written to any
//! `io::Write`. Every checkpoint is also logged.
//!
//! The reporter doubles as the run's sanity check. As a
//! [`PipelineObserver`] it fails the run with [`ProvisionError::Invariant`]
//! when:
//!
//! - a mint created by this run does not start at zero supply;
//! - a token account created by this run does not start at zero;
//! - after minting, supply or account amount did not grow by exactly the
//!   minted quantity.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::amount::Amount;
use crate::config::NATIVE_SYMBOL;
use crate::error::ProvisionError;
use crate::identity::Address;
use crate::pipeline::{PipelineObserver, ProvisioningContext, RunState, StepFailure, StepName};

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// `[2/9] QueryBalance ok balance=1 SOL`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// One reported step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checkpoint {
    pub run_id: Uuid,
    pub position: usize,
    pub total: usize,
    pub step: StepName,
    pub ok: bool,
    /// Which value the step observed, e.g. `supply`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    /// Human-denominated amount or base58 address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Raw smallest units, for amounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smallest: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        state: RunState,
    },
    Failure {
        state: RunState,
        step: StepName,
        cause: String,
    },
}

/// Terminal report of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub operator: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_account: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_amount: Option<String>,
    pub checkpoints: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

// ---- Invariant tracking ----

#[derive(Debug, Default)]
struct Baseline {
    fresh_mint: bool,
    fresh_account: bool,
    minted: Option<Amount>,
    pre_supply: Option<Amount>,
    pre_amount: Option<Amount>,
    supply_pending: bool,
    amount_pending: bool,
}

fn violation(step: StepName, detail: String) -> ProvisionError {
    ProvisionError::Invariant { step, detail }
}

fn expect_sum(
    step: StepName,
    what: &str,
    before: Amount,
    minted: Amount,
    observed: Amount,
) -> Result<(), ProvisionError> {
    let expected = before
        .checked_add(minted)
        .ok_or_else(|| violation(step, format!("{what} {before} + {minted} overflows")))?;
    if observed != expected {
        return Err(violation(
            step,
            format!("{what} after minting is {observed}, expected {before} + {minted} = {expected}"),
        ));
    }
    Ok(())
}

impl Baseline {
    fn check(&mut self, step: StepName, ctx: &ProvisioningContext) -> Result<(), ProvisionError> {
        match step {
            StepName::CreateMint => self.fresh_mint = true,
            StepName::CreateTokenAccount => self.fresh_account = true,
            StepName::MintTokens => {
                self.minted = ctx.last_minted();
                self.pre_supply = ctx.mint_supply();
                self.pre_amount = ctx.account_amount();
                self.supply_pending = true;
                self.amount_pending = true;
                self.fresh_mint = false;
                self.fresh_account = false;
            }
            StepName::QueryMintSupply => {
                let Some(observed) = ctx.mint_supply() else {
                    return Ok(());
                };
                if self.supply_pending {
                    self.supply_pending = false;
                    if let (Some(before), Some(minted)) = (self.pre_supply, self.minted) {
                        expect_sum(step, "supply", before, minted, observed)?;
                    }
                } else if self.fresh_mint {
                    self.fresh_mint = false;
                    if observed != Amount::ZERO {
                        return Err(violation(
                            step,
                            format!("new mint has supply {observed}, expected 0"),
                        ));
                    }
                }
            }
            StepName::QueryAccountAmount => {
                let Some(observed) = ctx.account_amount() else {
                    return Ok(());
                };
                if self.amount_pending {
                    self.amount_pending = false;
                    if let (Some(before), Some(minted)) = (self.pre_amount, self.minted) {
                        expect_sum(step, "account amount", before, minted, observed)?;
                    }
                } else if self.fresh_account {
                    self.fresh_account = false;
                    if observed != Amount::ZERO {
                        return Err(violation(
                            step,
                            format!("new token account holds {observed}, expected 0"),
                        ));
                    }
                }
            }
            StepName::Funding | StepName::QueryBalance => {}
        }
        Ok(())
    }
}

/// What a completed step contributes to its checkpoint.
enum Observed {
    Amount(&'static str, Amount),
    Address(&'static str, Address),
    State(RunState),
    Nothing,
}

fn observed(step: StepName, ctx: &ProvisioningContext) -> Observed {
    let amount = |field, value: Option<Amount>| value.map_or(Observed::Nothing, |v| Observed::Amount(field, v));
    let address = |field, value: Option<Address>| value.map_or(Observed::Nothing, |v| Observed::Address(field, v));
    match step {
        StepName::Funding => Observed::State(ctx.state()),
        StepName::QueryBalance => amount("balance", ctx.balance()),
        StepName::CreateMint => address("mint", ctx.mint()),
        StepName::QueryMintSupply => amount("supply", ctx.mint_supply()),
        StepName::CreateTokenAccount => address("token_account", ctx.token_account()),
        StepName::QueryAccountAmount => amount("amount", ctx.account_amount()),
        StepName::MintTokens => amount("minted", ctx.last_minted()),
    }
}

// ---- Reporter ----

/// Checkpoint renderer and invariant checker for one run.
pub struct Reporter<W: Write + Send> {
    out: W,
    format: ReportFormat,
    baseline: Baseline,
    checkpoints: Vec<Checkpoint>,
    total: usize,
}

impl<W: Write + Send> Reporter<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            out,
            format,
            baseline: Baseline::default(),
            checkpoints: Vec::new(),
            total: 0,
        }
    }

    /// Every checkpoint emitted so far, failures included.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Emits the summary line for `result` and returns it.
    pub fn finish(&mut self, result: &Result<ProvisioningContext, StepFailure>) -> RunSummary {
        let (ctx, outcome) = match result {
            Ok(ctx) => (ctx, Outcome::Success { state: ctx.state() }),
            Err(failure) => (
                &failure.context,
                Outcome::Failure {
                    state: failure.state,
                    step: failure.step(),
                    cause: failure.error.to_string(),
                },
            ),
        };
        let summary = RunSummary {
            run_id: ctx.run_id(),
            outcome,
            operator: ctx.operator_address(),
            mint: ctx.mint(),
            token_account: ctx.token_account(),
            supply: ctx.mint_supply().map(Amount::to_human),
            account_amount: ctx.account_amount().map(Amount::to_human),
            checkpoints: self.checkpoints.len(),
        };

        let line = match self.format {
            ReportFormat::Text => match &summary.outcome {
                Outcome::Success { state } => {
                    format!("run {} succeeded: state={state}", summary.run_id)
                }
                Outcome::Failure { state, step, cause } => {
                    format!("run {} failed at {step} in state {state}: {cause}", summary.run_id)
                }
            },
            ReportFormat::Json => self.to_json(&summary),
        };
        self.emit(&line);
        summary
    }

    fn record(&mut self, checkpoint: Checkpoint) {
        let line = match self.format {
            ReportFormat::Text => render_text(&checkpoint),
            ReportFormat::Json => self.to_json(&checkpoint),
        };
        self.emit(&line);
        self.checkpoints.push(checkpoint);
    }

    fn to_json<T: Serialize>(&self, value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|err| {
            warn!(%err, "report serialization failed");
            String::from("{}")
        })
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!(%err, "failed to write report line");
        }
    }
}

fn render_text(cp: &Checkpoint) -> String {
    let head = format!("[{}/{}] {}", cp.position, cp.total, cp.step);
    if let Some(error) = &cp.error {
        return format!("{head} FAILED: {error}");
    }
    match (cp.field, &cp.value) {
        (Some("balance"), Some(value)) => format!("{head} ok balance={value} {NATIVE_SYMBOL}"),
        (Some(field), Some(value)) => format!("{head} ok {field}={value}"),
        _ => format!("{head} ok"),
    }
}

impl<W: Write + Send> PipelineObserver for Reporter<W> {
    fn step_started(&mut self, _position: usize, total: usize, _step: StepName) {
        self.total = total;
    }

    fn step_completed(
        &mut self,
        position: usize,
        step: StepName,
        ctx: &ProvisioningContext,
    ) -> Result<(), ProvisionError> {
        self.baseline.check(step, ctx)?;

        let (field, value, smallest) = match observed(step, ctx) {
            Observed::Amount(field, amount) => {
                (Some(field), Some(amount.to_human()), Some(amount.smallest()))
            }
            Observed::Address(field, address) => (Some(field), Some(address.to_string()), None),
            Observed::State(state) => (Some("state"), Some(state.to_string()), None),
            Observed::Nothing => (None, None, None),
        };
        info!(
            run_id = %ctx.run_id(),
            position,
            step = %step,
            field = field.unwrap_or(""),
            value = value.as_deref().unwrap_or(""),
            "checkpoint"
        );
        self.record(Checkpoint {
            run_id: ctx.run_id(),
            position,
            total: self.total,
            step,
            ok: true,
            field,
            value,
            smallest,
            error: None,
            at: Utc::now(),
        });
        Ok(())
    }

    fn run_failed(&mut self, failure: &StepFailure) {
        warn!(
            run_id = %failure.context.run_id(),
            position = failure.position,
            step = %failure.step(),
            error = %failure.error,
            "checkpoint failed"
        );
        self.record(Checkpoint {
            run_id: failure.context.run_id(),
            position: failure.position,
            total: failure.total,
            step: failure.step(),
            ok: false,
            field: None,
            value: None,
            smallest: None,
            error: Some(failure.error.to_string()),
            at: Utc::now(),
        });
    }
}

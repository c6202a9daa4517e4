//! # Pipeline Executor
//!
//! Runs a [`Pipeline`] strictly in order against one context. The first
//! failure ends the run: later steps are never invoked and nothing already
//! done on the ledger is undone.
//!
//! ```text
//!   ctx₀ ──step 1──► ctx₁ ──step 2──► ctx₂ ── … ──step n──► ctxₙ  (Ok)
//!                      │
//!                      └─ error ──► StepFailure { position, state, error, context: ctx₀ }
//! ```
//!
//! A run timeout is one deadline for the whole run. Whichever step is
//! executing when it passes fails with [`ProvisionError::Timeout`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use super::context::{ProvisioningContext, RunState};
use super::plan::Pipeline;
use super::step::StepName;
use crate::error::ProvisionError;
use crate::ledger::LedgerClient;

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// A run that stopped early.
#[derive(Debug, Clone, Error)]
#[error("step {position}/{total} {} failed in state {state}: {error}", .error.step())]
pub struct StepFailure {
    /// 1-based position of the failing step.
    pub position: usize,
    /// Number of steps in the pipeline.
    pub total: usize,
    /// Run state the failing step was executing in.
    pub state: RunState,
    /// What went wrong.
    #[source]
    pub error: ProvisionError,
    /// The last context a step successfully produced.
    pub context: ProvisioningContext,
}

impl StepFailure {
    /// Name of the failing step.
    pub fn step(&self) -> StepName {
        self.error.step()
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Hooks called by the executor as a run progresses.
pub trait PipelineObserver: Send {
    /// Before step `position` of `total` starts.
    fn step_started(&mut self, _position: usize, _total: usize, _step: StepName) {}

    /// After a step succeeded. Returning an error fails the run at this step.
    fn step_completed(
        &mut self,
        _position: usize,
        _step: StepName,
        _ctx: &ProvisioningContext,
    ) -> Result<(), ProvisionError> {
        Ok(())
    }

    /// Once, when the run stops early.
    fn run_failed(&mut self, _failure: &StepFailure) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs pipelines against a shared ledger client.
#[derive(Clone)]
pub struct Executor {
    ledger: Arc<dyn LedgerClient>,
    run_timeout: Option<Duration>,
}

impl Executor {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            run_timeout: None,
        }
    }

    /// Limits every run to `limit` of wall-clock time.
    pub fn with_run_timeout(mut self, limit: Duration) -> Self {
        self.run_timeout = Some(limit);
        self
    }

    /// The whole-run deadline, if one is set.
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout
    }

    /// Runs `pipeline` from `initial`.
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        initial: ProvisioningContext,
    ) -> Result<ProvisioningContext, StepFailure> {
        self.execute_observed(pipeline, initial, &mut NoopObserver).await
    }

    /// Runs `pipeline` from `initial`, reporting progress to `observer`.
    pub async fn execute_observed(
        &self,
        pipeline: &Pipeline,
        initial: ProvisioningContext,
        observer: &mut dyn PipelineObserver,
    ) -> Result<ProvisioningContext, StepFailure> {
        let deadline = self
            .run_timeout
            .map(|limit| (Instant::now() + limit, limit));
        let total = pipeline.len();
        let run_id = initial.run_id();
        let mut ctx = initial;

        info!(%run_id, operator = %ctx.operator_address(), steps = total, "run started");

        for (index, step) in pipeline.steps().iter().enumerate() {
            let position = index + 1;
            let name = step.name();
            observer.step_started(position, total, name);
            info!(%run_id, position, total, step = %name, "step started");

            if let Some(state) = step.in_flight_state().filter(|s| *s > ctx.state()) {
                ctx = ctx.with_state(state);
            }

            let work = step.run(self.ledger.as_ref(), &ctx);
            let outcome = match deadline {
                Some((at, limit)) => tokio::time::timeout_at(at, work)
                    .await
                    .unwrap_or(Err(ProvisionError::Timeout { step: name, limit })),
                None => work.await,
            };

            let checked = outcome.and_then(|next| {
                observer.step_completed(position, name, &next)?;
                Ok(next)
            });

            match checked {
                Ok(next) => ctx = next,
                Err(error) => {
                    let failure = StepFailure {
                        position,
                        total,
                        state: ctx.state(),
                        error,
                        context: ctx,
                    };
                    warn!(
                        %run_id,
                        position,
                        step = %name,
                        state = %failure.state,
                        error = %failure.error,
                        "run aborted"
                    );
                    observer.run_failed(&failure);
                    return Err(failure);
                }
            }
        }

        info!(%run_id, state = %ctx.state(), "run completed");
        Ok(ctx)
    }
}

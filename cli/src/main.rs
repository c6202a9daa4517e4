// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Mintline CLI
//!
//! Entry point for the `mintline` binary. Parses CLI arguments, initializes
//! logging, builds the ledger backend, and runs one pipeline with a fresh
//! operator identity.
//!
//! The binary supports three subcommands:
//!
//! - `provision`: fund, create a mint and a token account, mint supply
//! - `airdrop`: balance, faucet request, balance
//! - `version`: print build version information
//!
//! Checkpoints go to stdout, logs to stderr. A failed run exits non-zero.

mod cli;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use mintline_core::config::{CORE_VERSION, TOKEN_DECIMALS};
use mintline_core::ledger::{InMemoryLedger, LedgerClient, RpcConfig, RpcLedgerClient};
use mintline_core::pipeline::{Pipeline, ProvisioningContext, TokenPlan};
use mintline_core::report::ReportFormat;
use mintline_core::{generate_identity, Executor, Reporter};

use cli::{Backend, Commands, LedgerArgs, MintlineCli, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = MintlineCli::parse();

    match cli.command {
        Commands::Provision(args) => {
            logging::init_logging(&cli.log_level, cli.log_format);
            let plan = TokenPlan {
                fund: args.fund,
                decimals: TOKEN_DECIMALS,
                mint: args.mint,
            };
            run_pipeline(&args.ledger, Pipeline::token_provisioning(&plan)).await
        }
        Commands::Airdrop(args) => {
            logging::init_logging(&cli.log_level, cli.log_format);
            run_pipeline(&args.ledger, Pipeline::airdrop(args.amount)).await
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs `pipeline` once for a freshly generated operator and reports it on
/// stdout.
async fn run_pipeline(args: &LedgerArgs, pipeline: Pipeline) -> Result<()> {
    let ledger = build_ledger(args)?;
    let mut executor = Executor::new(ledger);
    if args.timeout_secs > 0 {
        executor = executor.with_run_timeout(Duration::from_secs(args.timeout_secs));
    }

    let operator = generate_identity().context("failed to generate operator identity")?;
    let ctx = ProvisioningContext::new(operator);
    tracing::info!(
        run_id = %ctx.run_id(),
        operator = %ctx.operator_address(),
        backend = ?args.backend,
        steps = pipeline.len(),
        timeout = ?executor.run_timeout(),
        "starting run"
    );

    let format = match args.output {
        OutputFormat::Text => ReportFormat::Text,
        OutputFormat::Json => ReportFormat::Json,
    };
    let mut reporter = Reporter::new(std::io::stdout(), format);
    let result = executor.execute_observed(&pipeline, ctx, &mut reporter).await;
    let summary = reporter.finish(&result);

    match result {
        Ok(_) => Ok(()),
        Err(failure) => {
            Err(anyhow::Error::new(failure).context(format!("run {} failed", summary.run_id)))
        }
    }
}

/// Builds the ledger client selected on the command line.
fn build_ledger(args: &LedgerArgs) -> Result<Arc<dyn LedgerClient>> {
    match args.backend {
        Backend::Memory => Ok(Arc::new(InMemoryLedger::new())),
        Backend::Rpc => {
            let mut config = RpcConfig::for_cluster(args.cluster);
            if let Some(url) = &args.rpc_url {
                config.url = url.clone();
            }
            config.commitment = args.commitment;
            tracing::info!(url = %config.url, commitment = %config.commitment, "using rpc ledger");
            let client = RpcLedgerClient::new(config).context("failed to build RPC client")?;
            Ok(Arc::new(client))
        }
    }
}

/// Prints version information for the binary and core library.
fn print_version() {
    println!("mintline {}", env!("CARGO_PKG_VERSION"));
    println!("core     {CORE_VERSION}");
    println!("rustc    {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

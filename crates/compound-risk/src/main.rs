use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use compound_risk::config;
use compound_risk::constants::{CONFIG_DIR_ENV, DEFAULT_CONFIG_DIR};
use compound_risk::core::actions::{c_tokens_minted, CTokenMint};
use compound_risk::core::interest::estimate_interest;
use compound_risk::core::market::validate_market;
use compound_risk::core::session::SimulationSession;
use compound_risk::core::stress::{run_stress_test, StressReport};
use compound_risk::logging;
use compound_risk::store::JsonFileStore;
use compound_risk::types::{Action, InterestEstimate, PositionSnapshot, RiskMetrics};

/// Printed to stdout as JSON.
#[derive(Serialize)]
struct Report {
    session: String,
    applied: Vec<AppliedAction>,
    position: PositionSnapshot,
    metrics: RiskMetrics,
    #[serde(with = "rust_decimal::serde::str")]
    projection_days: Decimal,
    interest: InterestEstimate,
    stress: StressReport,
}

#[derive(Serialize)]
struct AppliedAction {
    action: Action,
    success: bool,
    message: String,
    minted: Option<CTokenMint>,
}

#[derive(Parser, Debug)]
#[command(name = "compound-risk")]
#[command(about = "Evaluate a simulated lending position and print a JSON risk report")]
struct Cli {
    /// Clear the stored session before applying actions
    #[arg(long)]
    reset: bool,

    /// Config directory (falls back to $COMPOUND_RISK_CONFIG_DIR, then ./config)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Actions to apply in order, each as kind:SYMBOL:amount (e.g. supply:ETH:2)
    #[arg(value_name = "ACTION")]
    actions: Vec<Action>,
}

fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().unwrap_or_else(|| {
        std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR))
    });

    let config = config::load_config(&config_dir)?;

    // Hold the guard for the process lifetime.
    let _guard = logging::init_tracing(&config.app.logging)?;

    let market = config.market_table();
    validate_market(&market).context("market table failed validation")?;

    info!(
        config_dir = %config_dir.display(),
        markets = market.len(),
        store = %config.app.store.path,
        "compound-risk starting"
    );

    let store = JsonFileStore::new(&config.app.store.path);
    let mut session = SimulationSession::open(store, config.app.session.default_id.clone())
        .context("failed to open simulation session")?
        .with_thresholds(config.risk.tiers);

    if cli.reset {
        session.reset().context("failed to reset session")?;
    }

    let mut applied = Vec::with_capacity(cli.actions.len());
    for action in cli.actions {
        let outcome = session.apply(&market, action.clone());
        let (success, message, minted) = match outcome {
            Ok(metrics) => (
                true,
                format!("health factor now {}", metrics.health_factor),
                c_tokens_minted(&market, &action)?,
            ),
            Err(e) => {
                warn!(error = %e, kind = action.kind.as_str(), symbol = %action.symbol, "action rejected");
                (false, e.to_string(), None)
            }
        };
        applied.push(AppliedAction {
            action,
            success,
            message,
            minted,
        });
    }

    let metrics = session.metrics(&market).context("risk evaluation failed")?;
    let interest = estimate_interest(session.snapshot(), &market, config.risk.projection_days)
        .context("interest projection failed")?;
    let stress = run_stress_test(
        session.snapshot(),
        &market,
        &config.risk.stress,
        &config.risk.tiers,
    )
    .context("stress test failed")?;

    if metrics.at_risk {
        warn!(health_factor = %metrics.health_factor, "position is eligible for liquidation");
    }

    let report = Report {
        session: session.id().to_string(),
        applied,
        position: session.snapshot().clone(),
        metrics,
        projection_days: config.risk.projection_days,
        interest,
        stress,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render report")?
    );

    Ok(())
}

//! scarcity-selftest: probe the external services and run the protocol
//! scenarios end to end.
//!
//! Exit code 0 when every scenario passes, 1 on unrecoverable failure.

use tracing::{error, info};

use scarcity_harness::{probe, scenarios};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scarcity=info".parse()?),
        )
        .init();

    info!("scarcity self-test starting");

    // Config file plus environment overrides.
    let data_dir = scarcity_wallet::paths::data_dir();
    let config_path = scarcity_wallet::paths::config_path(&data_dir);
    let config = scarcity_wallet::paths::load_config(&config_path)?;

    let report = probe::probe_services(&config).await;
    if !report.all_up() {
        info!(
            freebird = report.freebird,
            witness = report.witness,
            relay = report.relay,
            "running with degraded services; fallback paths engaged"
        );
    }

    let outcomes = scenarios::run_all(&config).await;
    let failed: Vec<_> = outcomes.iter().filter(|o| !o.passed).collect();

    for outcome in &outcomes {
        let status = if outcome.passed { "PASS" } else { "FAIL" };
        println!("{status}  {:<22} {}", outcome.name, outcome.detail);
    }

    if failed.is_empty() {
        info!(count = outcomes.len(), "all scenarios passed");
        Ok(())
    } else {
        error!(failed = failed.len(), "self-test failed");
        std::process::exit(1);
    }
}

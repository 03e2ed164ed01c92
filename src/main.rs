//! mailstat - Entry point for the delivery-status report run

use anyhow::Context;
use chrono::Utc;

use mailstat::config::{self, RunConfig};
use mailstat::providers::{Credential, MailjetClient};
use mailstat::services::SyncRunner;
use mailstat::storage::StateStore;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting mailstat");

    if let Err(e) = run().await {
        tracing::error!("Run failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let run_config = RunConfig::from_env()?;
    let config = config::load(&run_config.config_path)?;

    let store = StateStore::new(&run_config.state_path);
    let mut state = store.load().context("loading sync state")?;

    let api = MailjetClient::new().context("building provider client")?;
    let master = Credential::new(&run_config.api_id, &run_config.api_secret);

    let runner = SyncRunner::new(&api, &config, master);
    let summary = runner.run(&mut state, Utc::now()).await?;

    store.persist(&state).context("persisting sync state")?;
    tracing::info!(sent = summary.sent, failed = summary.failed, "Done");
    Ok(())
}

//! Headless reminders host: stdin/stdout JSON bridge over the facade.
//!
//! Reads `CommandEnvelope` messages as newline-delimited JSON from stdin and
//! writes `ResponseEnvelope` and `EventEnvelope` messages to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::sync::Arc;

use fae_reminders::host::run_stdio_bridge;
use fae_reminders::store::registered_reminder_store;
use fae_reminders::{InMemoryReminderStore, ReminderConfig, ReminderFacade, ReminderStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = ReminderConfig::default_config_path();
    let config = ReminderConfig::load_or_default(&config_path)
        .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .init();

    tracing::info!(config = %config_path.display(), "fae-reminders-host starting");

    let store: Arc<dyn ReminderStore> = match registered_reminder_store() {
        Some(store) => store,
        None => {
            tracing::info!("no platform reminders store registered; using in-memory store");
            Arc::new(InMemoryReminderStore::from_config(&config.store))
        }
    };
    let facade = ReminderFacade::from_config(store, &config)?;

    run_stdio_bridge(facade).await.map_err(|e| {
        tracing::error!(error = %e, "fae-reminders-host exited with error");
        anyhow::anyhow!("fae-reminders-host failed: {e}")
    })?;

    tracing::info!("fae-reminders-host shut down cleanly");
    Ok(())
}

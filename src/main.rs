//! Stalewatch entrypoint: loads configuration and runs the monitor loop.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use stalewatch::notify::email::load_template;
use stalewatch::persistence::{PersistenceError, SqliteCheckpointStore, migrate_database};
use stalewatch::{
    BitbucketGateway, CheckpointStore, CycleOutcome, EmailNotifier, EventSink,
    FileCheckpointStore, Monitor, MonitorError, StaleDetector, StalewatchConfig, TeamsNotifier,
    TracingEventSink, logging, shutdown,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), MonitorError> {
    let config = load_config()?;
    logging::init(&config.logging_options()?)?;
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);

    if config.migrate_db {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or(PersistenceError::MissingDatabaseUrl)?;
        migrate_database(database_url, events.as_ref())?;
        return Ok(());
    }

    config.validate()?;
    let monitor = build_monitor(&config, &events).await?;

    if config.once {
        let outcome = monitor.run_once(chrono::Utc::now()).await?;
        match &outcome {
            CycleOutcome::Notified {
                failed_channels, ..
            } if !failed_channels.is_empty() => {
                tracing::warn!(?failed_channels, "some notification channels failed");
            }
            _ => tracing::info!(?outcome, "single iteration finished"),
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown::cancel_on_signal(
        tokio::signal::ctrl_c(),
        cancel.clone(),
    ));

    monitor.run(cancel).await
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`MonitorError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<StalewatchConfig, MonitorError> {
    StalewatchConfig::load().map_err(|error| MonitorError::Configuration {
        message: error.to_string(),
    })
}

async fn build_monitor(
    config: &StalewatchConfig,
    events: &Arc<dyn EventSink>,
) -> Result<Monitor, MonitorError> {
    let gateway = BitbucketGateway::new(
        config.server_locator()?,
        config.credentials()?,
        config.request_timeout(),
    )?;
    gateway.probe().await?;
    tracing::info!(server = %gateway.locator().base(), "connected to Bitbucket");

    let detector = StaleDetector::new(
        Arc::new(gateway),
        config.keyword_filter(),
        config.stale_after_days,
        Arc::clone(events),
    );

    let mut monitor = Monitor::new(
        detector,
        config.repository_list(),
        checkpoint_store(config)?,
        Arc::clone(events),
        config.interval()?,
    )?;

    if let Some(settings) = config.smtp_settings() {
        let template = config
            .email_template()
            .map(|path| load_template(&path))
            .transpose()?;
        monitor = monitor.with_notifier(Arc::new(EmailNotifier::new(&settings, template)?));
    }
    if let Some(webhook) = config.teams_webhook() {
        monitor = monitor.with_notifier(Arc::new(TeamsNotifier::new(
            webhook,
            config.request_timeout(),
        )?));
    }
    if monitor.notifier_count() == 0 {
        tracing::warn!("no notification channel configured; stale pull requests are only logged");
    }

    Ok(monitor)
}

fn checkpoint_store(config: &StalewatchConfig) -> Result<Arc<dyn CheckpointStore>, MonitorError> {
    match config.database_url.as_deref() {
        Some(database_url) => Ok(Arc::new(SqliteCheckpointStore::new(database_url)?)),
        None => Ok(Arc::new(FileCheckpointStore::new(
            config.checkpoint_path.as_str(),
        ))),
    }
}

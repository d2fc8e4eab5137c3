//! Scheduled maintenance entry point: extends every event's occurrences up
//! to the configured horizon, then exits. Run it from cron or a timer.

use chrono::Utc;
use eventide_core::config::load_config;
use eventide_db::db::connection::create_pool;
use eventide_db::db::migrate::run_migrations;
use eventide_db::db::store::PgTimelineStore;
use eventide_service::context::ExpansionContext;
use eventide_service::maintenance::extend_all_events;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Installs the subscriber at debug level until the configured level is known.
fn init_tracing() -> FilterHandle {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    filter_handle
}

fn apply_log_level(handle: &FilterHandle, level: &str) {
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.modify(|current| *current = filter) {
                tracing::warn!(error = %e, "Could not apply configured log level");
            }
        }
        Err(e) => tracing::warn!(level, error = %e, "Unknown log level in config, staying at debug"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter_handle = init_tracing();

    let config = load_config()?;
    apply_log_level(&filter_handle, &config.logging.level);

    tracing::info!(
        time_zone = %config.events.time_zone,
        horizon_weeks = config.events.maintenance_horizon_weeks,
        concurrency = config.events.maintenance_concurrency,
        "Starting occurrence maintenance"
    );

    if config.database.run_migrations {
        run_migrations(&config.database.url).await?;
        tracing::info!("Schema migrations applied");
    }

    let store = PgTimelineStore::new(create_pool(&config.database).await?);
    let ctx = ExpansionContext::from_config(&config.events, Utc::now())?;

    let report = extend_all_events(
        &store,
        &ctx,
        config.events.maintenance_horizon(),
        config.events.maintenance_concurrency,
    )
    .await?;

    if report.failures > 0 {
        tracing::warn!(
            failures = report.failures,
            events = report.events,
            "Some events could not be extended"
        );
    }

    Ok(())
}

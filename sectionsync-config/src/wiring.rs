use anyhow::Context;
use sectionsync_core::{InProcStatusBus, PostgresStatusStore};
use tracing::info;

use crate::models::{DatabaseConfig, EventsConfig};

/// Connect the Postgres status store and apply migrations if configured.
pub async fn connect_status_store(
    config: &DatabaseConfig,
) -> anyhow::Result<PostgresStatusStore> {
    let url = config.url.as_deref().context(
        "status store database url is not configured; set DATABASE_URL",
    )?;

    let store = PostgresStatusStore::connect(
        url,
        config.max_connections,
        config.acquire_timeout(),
    )
    .await
    .context("failed to connect to status store database")?;

    if config.run_migrations {
        store
            .migrate()
            .await
            .context("failed to migrate status store")?;
    }

    info!(
        max_connections = config.max_connections,
        "Status store ready"
    );
    Ok(store)
}

pub fn status_bus(config: &EventsConfig) -> InProcStatusBus {
    InProcStatusBus::new(config.channel_capacity)
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sectionsync_model::{EntityId, Section, SectionStatus};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use super::SectionStatusStore;
use crate::error::{StoreError, StoreResult};

const COLUMNS: &str = "entity_id, section, content_hash, completed_at, \
    changed_at, started_at, error_message, updated_at";

/// Status store persisting to the `section_status` table.
#[derive(Clone, Debug)]
pub struct PostgresStatusStore {
    pool: PgPool,
}

impl PostgresStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        crate::MIGRATOR.run(&self.pool).await?;
        info!("Section status migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct SectionStatusRow {
    entity_id: i64,
    section: String,
    content_hash: String,
    completed_at: Option<DateTime<Utc>>,
    changed_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    error_message: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SectionStatusRow> for SectionStatus {
    type Error = StoreError;

    fn try_from(row: SectionStatusRow) -> Result<Self, Self::Error> {
        let entity_id = EntityId(row.entity_id);
        let section = row
            .section
            .parse::<Section>()
            .map_err(|source| StoreError::Corrupt { entity_id, source })?;
        Ok(SectionStatus {
            entity_id,
            section,
            content_hash: row.content_hash,
            completed_at: row.completed_at,
            changed_at: row.changed_at,
            started_at: row.started_at,
            error_message: row.error_message,
            updated_at: row.updated_at,
        })
    }
}

fn into_statuses(
    rows: Vec<SectionStatusRow>,
) -> StoreResult<Vec<SectionStatus>> {
    rows.into_iter().map(SectionStatus::try_from).collect()
}

#[async_trait]
impl SectionStatusStore for PostgresStatusStore {
    async fn get_status(
        &self,
        entity_id: EntityId,
        section: Section,
    ) -> StoreResult<Option<SectionStatus>> {
        let row = sqlx::query_as::<_, SectionStatusRow>(&format!(
            "SELECT {COLUMNS} FROM section_status \
             WHERE entity_id = $1 AND section = $2"
        ))
        .bind(entity_id.as_i64())
        .bind(section.key())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SectionStatus::try_from).transpose()
    }

    async fn upsert_status(
        &self,
        status: &SectionStatus,
    ) -> StoreResult<SectionStatus> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, SectionStatusRow>(&format!(
            r#"
            INSERT INTO section_status (
                entity_id, section, content_hash, completed_at, changed_at,
                started_at, error_message, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (entity_id, section) DO UPDATE SET
                content_hash = EXCLUDED.content_hash,
                completed_at = EXCLUDED.completed_at,
                changed_at = EXCLUDED.changed_at,
                started_at = EXCLUDED.started_at,
                error_message = EXCLUDED.error_message,
                updated_at = EXCLUDED.updated_at
            RETURNING {COLUMNS}
            "#
        ))
        .bind(status.entity_id.as_i64())
        .bind(status.section.key())
        .bind(&status.content_hash)
        .bind(status.completed_at)
        .bind(status.changed_at)
        .bind(status.started_at)
        .bind(&status.error_message)
        .bind(status.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn set_error(
        &self,
        entity_id: EntityId,
        section: Section,
        message: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<SectionStatus> {
        let row = sqlx::query_as::<_, SectionStatusRow>(&format!(
            r#"
            INSERT INTO section_status (
                entity_id, section, error_message, started_at, updated_at
            )
            VALUES ($1, $2, $3, NULL, $4)
            ON CONFLICT (entity_id, section) DO UPDATE SET
                error_message = EXCLUDED.error_message,
                started_at = NULL,
                updated_at = EXCLUDED.updated_at
            RETURNING {COLUMNS}
            "#
        ))
        .bind(entity_id.as_i64())
        .bind(section.key())
        .bind(message)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn set_started(
        &self,
        entity_id: EntityId,
        section: Section,
        at: DateTime<Utc>,
    ) -> StoreResult<SectionStatus> {
        let row = sqlx::query_as::<_, SectionStatusRow>(&format!(
            r#"
            INSERT INTO section_status (
                entity_id, section, started_at, updated_at
            )
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (entity_id, section) DO UPDATE SET
                started_at = EXCLUDED.started_at,
                updated_at = EXCLUDED.updated_at
            RETURNING {COLUMNS}
            "#
        ))
        .bind(entity_id.as_i64())
        .bind(section.key())
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn list_statuses(
        &self,
        entity_id: EntityId,
    ) -> StoreResult<Vec<SectionStatus>> {
        let rows = sqlx::query_as::<_, SectionStatusRow>(&format!(
            "SELECT {COLUMNS} FROM section_status \
             WHERE entity_id = $1 ORDER BY section"
        ))
        .bind(entity_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        into_statuses(rows)
    }

    async fn list_all(&self) -> StoreResult<Vec<SectionStatus>> {
        let rows = sqlx::query_as::<_, SectionStatusRow>(&format!(
            "SELECT {COLUMNS} FROM section_status \
             ORDER BY entity_id, section"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_statuses(rows)
    }
}

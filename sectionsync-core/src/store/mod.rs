//! Durable record of section update outcomes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sectionsync_model::{EntityId, Section, SectionStatus};

use crate::error::StoreResult;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStatusStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStatusStore;

/// Persistence port for [`SectionStatus`] records.
///
/// Every write is atomic for its `(entity_id, section)` key.
#[async_trait]
pub trait SectionStatusStore: Send + Sync {
    /// `Ok(None)` when the section was never attempted.
    async fn get_status(
        &self,
        entity_id: EntityId,
        section: Section,
    ) -> StoreResult<Option<SectionStatus>>;

    /// Insert or fully replace the record. Callers merge with the current
    /// record themselves before writing.
    async fn upsert_status(
        &self,
        status: &SectionStatus,
    ) -> StoreResult<SectionStatus>;

    /// Record a failed attempt: sets the error message, clears the running
    /// marker and leaves every other field untouched. Creates the record if
    /// it does not exist.
    async fn set_error(
        &self,
        entity_id: EntityId,
        section: Section,
        message: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<SectionStatus>;

    /// Mark an attempt as running. Creates the record if it does not exist.
    async fn set_started(
        &self,
        entity_id: EntityId,
        section: Section,
        at: DateTime<Utc>,
    ) -> StoreResult<SectionStatus>;

    /// All records of one entity ordered by section key.
    async fn list_statuses(
        &self,
        entity_id: EntityId,
    ) -> StoreResult<Vec<SectionStatus>>;

    /// Every record in the store.
    async fn list_all(&self) -> StoreResult<Vec<SectionStatus>>;
}

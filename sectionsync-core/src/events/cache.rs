use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sectionsync_model::{
    EntityId, Section, SectionFamily, SectionStatus, StatusEvent,
    StatusSummary,
};
use tracing::debug;

use super::StatusNotifier;
use crate::error::StoreResult;
use crate::store::SectionStatusStore;

/// Read model of the latest known status of every section.
///
/// Fed by status events and warmed from the store at startup, so status
/// queries from a UI never have to hit the database.
#[derive(Debug, Default)]
pub struct StatusCache {
    statuses: DashMap<(EntityId, Section), SectionStatus>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every record from `store`, replacing cached entries.
    pub async fn warm(
        &self,
        store: &dyn SectionStatusStore,
    ) -> StoreResult<usize> {
        let statuses = store.list_all().await?;
        let count = statuses.len();
        for status in statuses {
            self.put(status);
        }
        debug!("Status cache warmed with {} records", count);
        Ok(count)
    }

    pub fn put(&self, status: SectionStatus) {
        self.statuses
            .insert((status.entity_id, status.section), status);
    }

    pub fn get(
        &self,
        entity_id: EntityId,
        section: Section,
    ) -> Option<SectionStatus> {
        self.statuses
            .get(&(entity_id, section))
            .map(|entry| entry.value().clone())
    }

    /// Cached records of one entity ordered by section key.
    pub fn list(&self, entity_id: EntityId) -> Vec<SectionStatus> {
        let mut statuses: Vec<SectionStatus> = self
            .statuses
            .iter()
            .filter(|entry| entry.key().0 == entity_id)
            .map(|entry| entry.value().clone())
            .collect();
        statuses.sort_by_key(|status| status.section.key());
        statuses
    }

    /// Whether the section has completed at least once.
    pub fn has_section(&self, entity_id: EntityId, section: Section) -> bool {
        self.statuses
            .get(&(entity_id, section))
            .is_some_and(|entry| !entry.is_missing())
    }

    pub fn summary(
        &self,
        entity_id: EntityId,
        family: SectionFamily,
        now: DateTime<Utc>,
    ) -> StatusSummary {
        let statuses = self.list(entity_id);
        StatusSummary::from_statuses(family, &statuses, now)
    }

    /// Forget everything cached for an entity, e.g. after it was removed.
    pub fn evict(&self, entity_id: EntityId) -> usize {
        let before = self.statuses.len();
        self.statuses.retain(|key, _| key.0 != entity_id);
        before - self.statuses.len()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl StatusNotifier for StatusCache {
    fn notify(&self, event: &StatusEvent) {
        self.put(event.status.clone());
    }
}

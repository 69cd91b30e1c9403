use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sectionsync_model::{EntityId, Section, SectionStatus};

use super::SectionStatusStore;
use crate::error::StoreResult;

/// Process-local status store.
///
/// Backs tests and deployments that do not need statuses to survive a
/// restart.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    rows: DashMap<(EntityId, Section), SectionStatus>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn sorted(mut statuses: Vec<SectionStatus>) -> Vec<SectionStatus> {
    statuses.sort_by_key(|status| (status.entity_id, status.section.key()));
    statuses
}

#[async_trait]
impl SectionStatusStore for InMemoryStatusStore {
    async fn get_status(
        &self,
        entity_id: EntityId,
        section: Section,
    ) -> StoreResult<Option<SectionStatus>> {
        Ok(self
            .rows
            .get(&(entity_id, section))
            .map(|row| row.value().clone()))
    }

    async fn upsert_status(
        &self,
        status: &SectionStatus,
    ) -> StoreResult<SectionStatus> {
        self.rows
            .insert((status.entity_id, status.section), status.clone());
        Ok(status.clone())
    }

    async fn set_error(
        &self,
        entity_id: EntityId,
        section: Section,
        message: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<SectionStatus> {
        let mut row = self
            .rows
            .entry((entity_id, section))
            .or_insert_with(|| SectionStatus::new(entity_id, section, at));
        row.error_message = message.to_string();
        row.started_at = None;
        row.updated_at = at;
        Ok(row.clone())
    }

    async fn set_started(
        &self,
        entity_id: EntityId,
        section: Section,
        at: DateTime<Utc>,
    ) -> StoreResult<SectionStatus> {
        let mut row = self
            .rows
            .entry((entity_id, section))
            .or_insert_with(|| SectionStatus::new(entity_id, section, at));
        row.started_at = Some(at);
        row.updated_at = at;
        Ok(row.clone())
    }

    async fn list_statuses(
        &self,
        entity_id: EntityId,
    ) -> StoreResult<Vec<SectionStatus>> {
        Ok(sorted(
            self.rows
                .iter()
                .filter(|row| row.key().0 == entity_id)
                .map(|row| row.value().clone())
                .collect(),
        ))
    }

    async fn list_all(&self) -> StoreResult<Vec<SectionStatus>> {
        Ok(sorted(
            self.rows.iter().map(|row| row.value().clone()).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use sectionsync_model::CharacterSection;

    fn assets() -> Section {
        CharacterSection::Assets.into()
    }

    #[tokio::test]
    async fn missing_row_is_none() {
        let store = InMemoryStatusStore::new();
        assert!(store.get_status(EntityId(1), assets()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_error_creates_row_and_keeps_completion() {
        let store = InMemoryStatusStore::new();
        let now = Utc::now();

        let created = store
            .set_error(EntityId(1), assets(), "boom", now)
            .await
            .unwrap();
        assert_eq!(created.error_message, "boom");
        assert!(created.completed_at.is_none());

        let mut done = SectionStatus::new(EntityId(1), assets(), now);
        done.completed_at = Some(now);
        done.content_hash = "abc".into();
        store.upsert_status(&done).await.unwrap();

        let later = now + TimeDelta::minutes(1);
        store.set_started(EntityId(1), assets(), later).await.unwrap();
        let failed = store
            .set_error(EntityId(1), assets(), "again", later)
            .await
            .unwrap();
        assert_eq!(failed.completed_at, Some(now));
        assert_eq!(failed.content_hash, "abc");
        assert_eq!(failed.error_message, "again");
        assert!(failed.started_at.is_none());
        assert_eq!(failed.updated_at, later);
    }

    #[tokio::test]
    async fn list_statuses_filters_by_entity_in_key_order() {
        let store = InMemoryStatusStore::new();
        let now = Utc::now();
        for section in [CharacterSection::Skills, CharacterSection::Assets] {
            store.set_started(EntityId(1), section.into(), now).await.unwrap();
        }
        store.set_started(EntityId(2), assets(), now).await.unwrap();

        let rows = store.list_statuses(EntityId(1)).await.unwrap();
        let keys: Vec<String> =
            rows.iter().map(|row| row.section.key()).collect();
        assert_eq!(keys, vec!["character:assets", "character:skills"]);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }
}

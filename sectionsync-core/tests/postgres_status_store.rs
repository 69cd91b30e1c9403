#![cfg(feature = "postgres")]

use chrono::{DateTime, TimeDelta, Utc};
use sectionsync_core::{PostgresStatusStore, SectionStatusStore};
use sectionsync_model::{
    CharacterSection, CorporationSection, EntityId, SectionStatus,
};
use sqlx::PgPool;

// Postgres keeps microsecond precision.
fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_micros(Utc::now().timestamp_micros())
        .unwrap_or_default()
}

#[sqlx::test(migrator = "sectionsync_core::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn upsert_then_get_round_trips(pool: PgPool) {
    let store = PostgresStatusStore::new(pool);
    let at = now();
    let mut status = SectionStatus::new(
        EntityId(2_112_000_001),
        CharacterSection::WalletJournal.into(),
        at,
    );
    status.content_hash = "deadbeef".into();
    status.completed_at = Some(at);
    status.changed_at = Some(at);

    let saved = store.upsert_status(&status).await.unwrap();
    assert_eq!(saved, status);

    let loaded = store
        .get_status(status.entity_id, status.section)
        .await
        .unwrap();
    assert_eq!(loaded, Some(status));
}

#[sqlx::test(migrator = "sectionsync_core::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn set_error_preserves_completion(pool: PgPool) {
    let store = PostgresStatusStore::new(pool);
    let entity = EntityId(98_000_001);
    let section = CorporationSection::WalletJournal3.into();
    let at = now();

    let mut status = SectionStatus::new(entity, section, at);
    status.content_hash = "cafe".into();
    status.completed_at = Some(at);
    store.upsert_status(&status).await.unwrap();

    let later = at + TimeDelta::minutes(5);
    let started = store.set_started(entity, section, later).await.unwrap();
    assert_eq!(started.started_at, Some(later));

    let failed = store
        .set_error(entity, section, "upstream 502", later)
        .await
        .unwrap();
    assert_eq!(failed.error_message, "upstream 502");
    assert_eq!(failed.completed_at, Some(at));
    assert_eq!(failed.content_hash, "cafe");
    assert!(failed.started_at.is_none());
}

#[sqlx::test(migrator = "sectionsync_core::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn set_error_creates_missing_row(pool: PgPool) {
    let store = PostgresStatusStore::new(pool);
    let entity = EntityId(7);
    let section = CharacterSection::Mails.into();

    let created = store
        .set_error(entity, section, "token expired", now())
        .await
        .unwrap();
    assert!(created.completed_at.is_none());
    assert!(created.content_hash.is_empty());

    let listed = store.list_statuses(entity).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(store.list_all().await.unwrap().len(), 1);
    assert!(
        store
            .get_status(EntityId(8), section)
            .await
            .unwrap()
            .is_none()
    );
}

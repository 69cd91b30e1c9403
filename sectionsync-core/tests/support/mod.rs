#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sectionsync_core::{
    BoxError, Credential, FetchContext, InMemoryStatusStore, InProcStatusBus,
    Orchestrator, PipelineRegistry, SectionFetcher, SectionStatusStore,
    SectionUpdater, StaticCredentialProvider, StatusCache, StoreError,
    StoreResult, VirtualTimeProvider,
};
use sectionsync_model::{
    CharacterSection, EntityId, GeneralSection, ModelError, Section,
    SectionStatus,
};
use tokio::sync::Notify;

pub const CHARACTER: EntityId = EntityId(90_000_001);

pub fn implants() -> Section {
    CharacterSection::Implants.into()
}

pub fn skills() -> Section {
    CharacterSection::Skills.into()
}

pub fn types() -> Section {
    GeneralSection::Types.into()
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap()
}

/// Remote data source whose answers tests can script.
#[derive(Debug, Default)]
pub struct FakeSource {
    calls: AtomicUsize,
    payload: Mutex<Vec<i64>>,
    failure: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    panic: AtomicBool,
}

impl FakeSource {
    pub fn new(payload: Vec<i64>) -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(payload),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_payload(&self, payload: Vec<i64>) {
        *self.payload.lock().unwrap() = payload;
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
        self.panic.store(false, Ordering::SeqCst);
    }

    pub fn panic_on_fetch(&self) {
        self.panic.store(true, Ordering::SeqCst);
    }

    /// Hold every fetch until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fetcher(self: &Arc<Self>) -> SourceFetcher {
        SourceFetcher(Arc::clone(self))
    }
}

#[derive(Debug)]
pub struct SourceFetcher(Arc<FakeSource>);

#[async_trait]
impl SectionFetcher for SourceFetcher {
    type Payload = Vec<i64>;

    async fn fetch(
        &self,
        _cx: &FetchContext,
        _entity_id: EntityId,
    ) -> Result<Vec<i64>, BoxError> {
        let source = &self.0;
        source.calls.fetch_add(1, Ordering::SeqCst);

        let gate = source.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if source.panic.load(Ordering::SeqCst) {
            panic!("remote client bug");
        }
        if let Some(message) = source.failure.lock().unwrap().clone() {
            return Err(message.into());
        }
        Ok(source.payload.lock().unwrap().clone())
    }
}

/// Local storage recording every payload it is asked to persist.
#[derive(Debug, Default)]
pub struct RecordingSink {
    applied: Mutex<Vec<Vec<i64>>>,
    failure: Mutex<Option<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn applied(&self) -> Vec<Vec<i64>> {
        self.applied.lock().unwrap().clone()
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn updater(self: &Arc<Self>) -> SinkUpdater {
        SinkUpdater(Arc::clone(self))
    }
}

#[derive(Debug)]
pub struct SinkUpdater(Arc<RecordingSink>);

#[async_trait]
impl SectionUpdater<Vec<i64>> for SinkUpdater {
    async fn apply(
        &self,
        _cx: &FetchContext,
        _entity_id: EntityId,
        payload: Vec<i64>,
    ) -> Result<(), BoxError> {
        if let Some(message) = self.0.failure.lock().unwrap().clone() {
            return Err(message.into());
        }
        self.0.applied.lock().unwrap().push(payload);
        Ok(())
    }
}

/// In-memory store whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: InMemoryStatusStore,
    fail_upsert: AtomicBool,
    fail_set_error: AtomicBool,
}

impl FaultyStore {
    pub fn fail_upserts(&self) {
        self.fail_upsert.store(true, Ordering::SeqCst);
    }

    pub fn fail_error_writes(&self) {
        self.fail_set_error.store(true, Ordering::SeqCst);
    }

    fn fault(
        flag: &AtomicBool,
        entity_id: EntityId,
        operation: &str,
    ) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt {
                entity_id,
                source: ModelError::UnknownSection(format!(
                    "{operation} rejected"
                )),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SectionStatusStore for FaultyStore {
    async fn get_status(
        &self,
        entity_id: EntityId,
        section: Section,
    ) -> StoreResult<Option<SectionStatus>> {
        self.inner.get_status(entity_id, section).await
    }

    async fn upsert_status(
        &self,
        status: &SectionStatus,
    ) -> StoreResult<SectionStatus> {
        Self::fault(&self.fail_upsert, status.entity_id, "upsert")?;
        self.inner.upsert_status(status).await
    }

    async fn set_error(
        &self,
        entity_id: EntityId,
        section: Section,
        message: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<SectionStatus> {
        Self::fault(&self.fail_set_error, entity_id, "set_error")?;
        self.inner.set_error(entity_id, section, message, at).await
    }

    async fn set_started(
        &self,
        entity_id: EntityId,
        section: Section,
        at: DateTime<Utc>,
    ) -> StoreResult<SectionStatus> {
        self.inner.set_started(entity_id, section, at).await
    }

    async fn list_statuses(
        &self,
        entity_id: EntityId,
    ) -> StoreResult<Vec<SectionStatus>> {
        self.inner.list_statuses(entity_id).await
    }

    async fn list_all(&self) -> StoreResult<Vec<SectionStatus>> {
        self.inner.list_all().await
    }
}

/// Orchestrator wired to in-memory fakes and a virtual clock.
///
/// Implants and the general types section share `source`/`sink`; skills
/// uses its own pair so batch tests can fail one section independently.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub store: Arc<FaultyStore>,
    pub clock: VirtualTimeProvider,
    pub source: Arc<FakeSource>,
    pub sink: Arc<RecordingSink>,
    pub skills_source: Arc<FakeSource>,
    pub credentials: Arc<StaticCredentialProvider>,
    pub bus: Arc<InProcStatusBus>,
    pub cache: Arc<StatusCache>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(FaultyStore::default());
        let clock = VirtualTimeProvider::new_at(start_time());
        let source = FakeSource::new(vec![1, 2, 3]);
        let sink = RecordingSink::new();
        let skills_source = FakeSource::new(vec![42]);
        let skills_sink = RecordingSink::new();

        let credentials = Arc::new(StaticCredentialProvider::new().with(
            Credential::new(
                CHARACTER,
                "access-token",
                CharacterSection::ALL
                    .iter()
                    .flat_map(|section| section.scopes().iter().copied()),
            ),
        ));

        let registry = PipelineRegistry::new()
            .with(implants(), source.fetcher(), sink.updater())
            .with(types(), source.fetcher(), sink.updater())
            .with(skills(), skills_source.fetcher(), skills_sink.updater());

        let bus = Arc::new(InProcStatusBus::new(64));
        let cache = Arc::new(StatusCache::new());

        let orchestrator = Orchestrator::builder(
            Arc::clone(&store) as Arc<dyn SectionStatusStore>,
            Arc::clone(&credentials) as _,
        )
        .registry(registry)
        .notifier(Arc::clone(&bus) as _)
        .notifier(Arc::clone(&cache) as _)
        .time_provider(Arc::new(clock.clone()))
        .build();

        Self {
            orchestrator,
            store,
            clock,
            source,
            sink,
            skills_source,
            credentials,
            bus,
            cache,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        use sectionsync_core::TimeProvider;
        self.clock.utc_now()
    }

    /// Move the clock just past the TTL of `section`.
    pub fn expire(&self, section: Section) {
        let ttl = TimeDelta::from_std(section.ttl()).unwrap();
        self.clock.advance(ttl + TimeDelta::seconds(1));
    }

    pub async fn status(&self, section: Section) -> Option<SectionStatus> {
        let entity_id = if section.requires_credential() {
            CHARACTER
        } else {
            EntityId::GENERAL
        };
        self.store.get_status(entity_id, section).await.unwrap()
    }
}

/// Yield until `condition` holds, giving spawned tasks a chance to run.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

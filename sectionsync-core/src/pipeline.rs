//! Fetch and apply seams for a single section.
//!
//! A section is refreshed by a [`SectionFetcher`] producing a typed payload
//! and a [`SectionUpdater`] persisting it. The orchestrator only sees the
//! type-erased [`SectionPipeline`], which also decides whether the updater
//! needs to run at all by comparing content hashes.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use sectionsync_model::{EntityId, Section};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::credentials::Credential;
use crate::error::{BoxError, SyncError, SyncResult};
use crate::hashing::{ContentHash, ContentHasher};

/// Everything a fetcher or updater may need beyond the entity id.
#[derive(Debug, Clone)]
pub struct FetchContext {
    entity_id: EntityId,
    section: Section,
    credential: Option<Credential>,
    cancel: CancellationToken,
}

impl FetchContext {
    pub fn new(
        entity_id: EntityId,
        section: Section,
        credential: Option<Credential>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            entity_id,
            section,
            credential,
            cancel,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn section(&self) -> Section {
        self.section
    }

    /// Present for every section that requires authentication.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Fires when the caller that started this update gives up on it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Retrieves the current data of one section from its remote source.
#[async_trait]
pub trait SectionFetcher: Send + Sync + 'static {
    type Payload: Serialize + Send + Sync + 'static;

    async fn fetch(
        &self,
        cx: &FetchContext,
        entity_id: EntityId,
    ) -> Result<Self::Payload, BoxError>;
}

/// Persists a fetched payload into local storage.
#[async_trait]
pub trait SectionUpdater<P>: Send + Sync + 'static
where
    P: Send + 'static,
{
    async fn apply(
        &self,
        cx: &FetchContext,
        entity_id: EntityId,
        payload: P,
    ) -> Result<(), BoxError>;
}

/// Fetcher backed by an async closure.
pub struct FnFetcher<F>(F);

impl<F> fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFetcher")
    }
}

/// Wraps `f` as a [`SectionFetcher`].
pub fn fetch_fn<F, Fut, P>(f: F) -> FnFetcher<F>
where
    F: Fn(FetchContext, EntityId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<P, BoxError>> + Send,
    P: Serialize + Send + Sync + 'static,
{
    FnFetcher(f)
}

#[async_trait]
impl<F, Fut, P> SectionFetcher for FnFetcher<F>
where
    F: Fn(FetchContext, EntityId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<P, BoxError>> + Send,
    P: Serialize + Send + Sync + 'static,
{
    type Payload = P;

    async fn fetch(
        &self,
        cx: &FetchContext,
        entity_id: EntityId,
    ) -> Result<P, BoxError> {
        (self.0)(cx.clone(), entity_id).await
    }
}

/// Updater backed by an async closure.
pub struct FnUpdater<F>(F);

impl<F> fmt::Debug for FnUpdater<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnUpdater")
    }
}

/// Wraps `f` as a [`SectionUpdater`].
pub fn update_fn<F, Fut, P>(f: F) -> FnUpdater<F>
where
    F: Fn(FetchContext, EntityId, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
    P: Send + 'static,
{
    FnUpdater(f)
}

#[async_trait]
impl<F, Fut, P> SectionUpdater<P> for FnUpdater<F>
where
    F: Fn(FetchContext, EntityId, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
    P: Send + 'static,
{
    async fn apply(
        &self,
        cx: &FetchContext,
        entity_id: EntityId,
        payload: P,
    ) -> Result<(), BoxError> {
        (self.0)(cx.clone(), entity_id, payload).await
    }
}

/// Inputs of a pipeline run taken from the section's prior status.
#[derive(Debug, Clone, Default)]
pub struct ApplyPlan {
    /// Content hash of the last successful update, if any.
    pub prior_hash: Option<String>,
    /// Apply even when the content did not change.
    pub force: bool,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub hash: ContentHash,
    pub changed: bool,
    /// Whether the updater ran.
    pub applied: bool,
}

/// Type-erased fetch, hash and apply sequence of one section.
#[async_trait]
pub trait SectionPipeline: Send + Sync {
    async fn run(
        &self,
        cx: &FetchContext,
        plan: ApplyPlan,
    ) -> SyncResult<PipelineOutcome>;
}

/// [`SectionPipeline`] joining a fetcher with the updater for its payload.
pub struct TypedPipeline<F, U> {
    fetcher: F,
    updater: U,
    hasher: ContentHasher,
}

impl<F, U> TypedPipeline<F, U>
where
    F: SectionFetcher,
    U: SectionUpdater<F::Payload>,
{
    pub fn new(fetcher: F, updater: U) -> Self {
        Self {
            fetcher,
            updater,
            hasher: ContentHasher::new(),
        }
    }
}

impl<F, U> fmt::Debug for TypedPipeline<F, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPipeline")
            .field("fetcher", &std::any::type_name::<F>())
            .field("updater", &std::any::type_name::<U>())
            .finish()
    }
}

#[async_trait]
impl<F, U> SectionPipeline for TypedPipeline<F, U>
where
    F: SectionFetcher,
    U: SectionUpdater<F::Payload>,
{
    async fn run(
        &self,
        cx: &FetchContext,
        plan: ApplyPlan,
    ) -> SyncResult<PipelineOutcome> {
        let entity_id = cx.entity_id();
        let section = cx.section();

        let payload = self
            .fetcher
            .fetch(cx, entity_id)
            .await
            .map_err(|err| SyncError::fetch(entity_id, section, err))?;

        let hash = self.hasher.hash(section, &payload)?;
        let changed = plan.prior_hash.as_deref() != Some(hash.as_str());
        let applied = plan.force || changed;

        if applied {
            self.updater
                .apply(cx, entity_id, payload)
                .await
                .map_err(|err| SyncError::update(entity_id, section, err))?;
        }

        Ok(PipelineOutcome {
            hash,
            changed,
            applied,
        })
    }
}

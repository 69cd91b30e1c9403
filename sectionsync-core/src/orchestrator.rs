//! Conditional, deduplicated refresh of sections.
//!
//! [`Orchestrator::update_section`] is the single entry point that decides
//! whether a section needs refreshing, makes sure only one refresh per
//! `(section, entity)` runs at a time and keeps the section's status record
//! in step with what actually happened.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use sectionsync_model::{
    EntityId, Section, SectionFamily, SectionStatus, StatusEvent,
    StatusSummary, UpdatePhase,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credentials::CredentialProvider;
use crate::error::{SyncError, SyncResult};
use crate::events::StatusNotifier;
use crate::pipeline::{ApplyPlan, FetchContext, PipelineOutcome};
use crate::registry::PipelineRegistry;
use crate::singleflight::{SingleFlight, panic_message};
use crate::store::SectionStatusStore;
use crate::time::{SystemTimeProvider, TimeProvider};

/// Request to refresh one section of one entity.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub entity_id: EntityId,
    pub section: Section,
    /// Bypass the staleness gate and apply even unchanged content.
    pub force_update: bool,
    cancel: Option<CancellationToken>,
}

impl UpdateRequest {
    pub fn new(
        entity_id: impl Into<EntityId>,
        section: impl Into<Section>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            section: section.into(),
            force_update: false,
            cancel: None,
        }
    }

    /// Request for a general section, keyed by [`EntityId::GENERAL`].
    pub fn general(section: impl Into<Section>) -> Self {
        Self::new(EntityId::GENERAL, section)
    }

    /// Skip the freshness check. A forced request that joins an update
    /// already running for the same section does not start another one; it
    /// shares that update's result, which skips the updater when the
    /// content is unchanged.
    pub fn force(mut self, force_update: bool) -> Self {
        self.force_update = force_update;
        self
    }

    /// Cancel the update when `token` fires. Only the token of the caller
    /// that starts an update is observed; callers joining an update that is
    /// already running share its fate.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct FlightKey {
    section: Section,
    entity_id: EntityId,
}

struct Inner {
    store: Arc<dyn SectionStatusStore>,
    credentials: Arc<dyn CredentialProvider>,
    registry: PipelineRegistry,
    notifiers: Vec<Arc<dyn StatusNotifier>>,
    clock: Arc<dyn TimeProvider>,
}

/// Runs section updates against a status store.
///
/// Cheap to clone; clones share the in-flight table, so deduplication holds
/// across all of them.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
    flights: SingleFlight<FlightKey, bool>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.inner.registry)
            .field("notifiers", &self.inner.notifiers.len())
            .field("flights", &self.flights)
            .finish()
    }
}

/// Assembles an [`Orchestrator`].
pub struct OrchestratorBuilder {
    store: Arc<dyn SectionStatusStore>,
    credentials: Arc<dyn CredentialProvider>,
    registry: PipelineRegistry,
    notifiers: Vec<Arc<dyn StatusNotifier>>,
    clock: Arc<dyn TimeProvider>,
}

impl fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("registry", &self.registry)
            .field("notifiers", &self.notifiers.len())
            .finish()
    }
}

impl OrchestratorBuilder {
    pub fn registry(mut self, registry: PipelineRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add an observer of status events. May be called repeatedly.
    pub fn notifier(mut self, notifier: Arc<dyn StatusNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            inner: Arc::new(Inner {
                store: self.store,
                credentials: self.credentials,
                registry: self.registry,
                notifiers: self.notifiers,
                clock: self.clock,
            }),
            flights: SingleFlight::new(),
        }
    }
}

impl Orchestrator {
    pub fn builder(
        store: Arc<dyn SectionStatusStore>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            store,
            credentials,
            registry: PipelineRegistry::new(),
            notifiers: Vec::new(),
            clock: Arc::new(SystemTimeProvider),
        }
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.inner.registry
    }

    /// Number of section updates currently executing.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    /// Refresh a section if it is stale or `force_update` is set.
    ///
    /// Returns `Ok(true)` when the fetched content differs from what was
    /// stored before, `Ok(false)` when it was identical or the section was
    /// still fresh and nothing ran. Concurrent calls for the same section
    /// and entity share one execution and observe the same result.
    pub async fn update_section(
        &self,
        request: UpdateRequest,
    ) -> SyncResult<bool> {
        self.validate(&request)?;
        let UpdateRequest {
            entity_id,
            section,
            force_update,
            ..
        } = request;

        if !force_update {
            let now = self.inner.clock.utc_now();
            if let Some(status) =
                self.inner.store.get_status(entity_id, section).await?
                && !status.is_expired(now)
            {
                debug!(
                    entity_id = %entity_id,
                    section = %section,
                    "Section is current, skipping update"
                );
                return Ok(false);
            }
        }

        let key = FlightKey { section, entity_id };
        let inner = Arc::clone(&self.inner);
        let changed = self
            .flights
            .run(key, async move { inner.execute(request).await })
            .await?;

        info!(
            entity_id = %entity_id,
            section = %section,
            forced = force_update,
            changed,
            "Section update completed"
        );
        Ok(changed)
    }

    /// Update several sections of one entity concurrently.
    ///
    /// Results are returned in the order of `sections`; one failing section
    /// does not affect the others.
    pub async fn update_sections(
        &self,
        entity_id: EntityId,
        sections: impl IntoIterator<Item = Section>,
        force_update: bool,
    ) -> Vec<(Section, SyncResult<bool>)> {
        let updates = sections.into_iter().map(|section| {
            let request =
                UpdateRequest::new(entity_id, section).force(force_update);
            async move { (section, self.update_section(request).await) }
        });
        join_all(updates).await
    }

    /// Update every registered section of `family` for `entity_id`.
    pub async fn update_family(
        &self,
        entity_id: EntityId,
        family: SectionFamily,
        force_update: bool,
    ) -> Vec<(Section, SyncResult<bool>)> {
        let sections = self.inner.registry.sections_of(family);
        self.update_sections(entity_id, sections, force_update).await
    }

    /// Whether the section has completed successfully at least once.
    pub async fn has_section(
        &self,
        entity_id: EntityId,
        section: Section,
    ) -> SyncResult<bool> {
        Ok(self
            .inner
            .store
            .get_status(entity_id, section)
            .await?
            .is_some_and(|status| !status.is_missing()))
    }

    pub async fn section_status(
        &self,
        entity_id: EntityId,
        section: Section,
    ) -> SyncResult<Option<SectionStatus>> {
        Ok(self.inner.store.get_status(entity_id, section).await?)
    }

    pub async fn list_statuses(
        &self,
        entity_id: EntityId,
    ) -> SyncResult<Vec<SectionStatus>> {
        Ok(self.inner.store.list_statuses(entity_id).await?)
    }

    /// Health of all sections of a family, read from the store.
    pub async fn summary(
        &self,
        entity_id: EntityId,
        family: SectionFamily,
    ) -> SyncResult<StatusSummary> {
        let statuses = self.inner.store.list_statuses(entity_id).await?;
        let now = self.inner.clock.utc_now();
        Ok(StatusSummary::from_statuses(family, &statuses, now))
    }

    fn validate(&self, request: &UpdateRequest) -> SyncResult<()> {
        let section = request.section;
        if !self.inner.registry.contains(section) {
            return Err(SyncError::UnregisteredSection(section));
        }
        match (section.family(), request.entity_id.is_general()) {
            (SectionFamily::General, false) => {
                Err(SyncError::InvalidRequest(format!(
                    "general section {} must use entity id {}",
                    section,
                    EntityId::GENERAL
                )))
            }
            (SectionFamily::Character | SectionFamily::Corporation, true) => {
                Err(SyncError::InvalidRequest(format!(
                    "section {} requires a non-zero entity id",
                    section
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Inner {
    async fn execute(&self, request: UpdateRequest) -> SyncResult<bool> {
        let entity_id = request.entity_id;
        let section = request.section;
        let pipeline = self
            .registry
            .get(section)
            .ok_or(SyncError::UnregisteredSection(section))?;

        let credential = if section.requires_credential() {
            let credential = self
                .credentials
                .valid_credential(entity_id, section.scopes())
                .await
                .map_err(|err| SyncError::credential(entity_id, err))
                .inspect_err(|err| {
                    warn!(
                        entity_id = %entity_id,
                        section = %section,
                        error = %err,
                        "Section update aborted"
                    )
                })?;
            Some(credential)
        } else {
            None
        };

        let prior = self.store.get_status(entity_id, section).await?;
        self.mark_started(entity_id, section, prior.as_ref()).await;

        let cancel = request.cancel.unwrap_or_default();
        let cx = FetchContext::new(entity_id, section, credential, cancel);
        let plan = ApplyPlan {
            prior_hash: prior.as_ref().map(|s| s.content_hash.clone()),
            force: request.force_update,
        };

        let run = AssertUnwindSafe(pipeline.run(&cx, plan)).catch_unwind();
        let result = tokio::select! {
            biased;
            _ = cx.cancellation().cancelled() => {
                Err(SyncError::Cancelled { entity_id, section })
            }
            outcome = run => outcome.unwrap_or_else(|panic| {
                Err(SyncError::Panicked(panic_message(panic)))
            }),
        };

        match result {
            Ok(outcome) => self.record_success(prior, &cx, outcome).await,
            Err(err) => {
                warn!(
                    entity_id = %entity_id,
                    section = %section,
                    error = %err,
                    "Section update failed"
                );
                self.record_failure(prior, entity_id, section, &err).await;
                Err(err)
            }
        }
    }

    async fn mark_started(
        &self,
        entity_id: EntityId,
        section: Section,
        prior: Option<&SectionStatus>,
    ) {
        let now = self.clock.utc_now();
        let status =
            match self.store.set_started(entity_id, section, now).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(
                        entity_id = %entity_id,
                        section = %section,
                        error = %err,
                        "Failed to mark section update as started"
                    );
                    let mut status = prior.cloned().unwrap_or_else(|| {
                        SectionStatus::new(entity_id, section, now)
                    });
                    status.started_at = Some(now);
                    status
                }
            };
        self.publish(UpdatePhase::Started, status);
    }

    async fn record_success(
        &self,
        prior: Option<SectionStatus>,
        cx: &FetchContext,
        outcome: PipelineOutcome,
    ) -> SyncResult<bool> {
        let now = self.clock.utc_now();
        let mut status = prior.clone().unwrap_or_else(|| {
            SectionStatus::new(cx.entity_id(), cx.section(), now)
        });
        status.content_hash = outcome.hash.into_string();
        status.completed_at = Some(now);
        if outcome.changed {
            status.changed_at = Some(now);
        }
        status.started_at = None;
        status.error_message.clear();
        status.updated_at = now;

        let saved = match self.store.upsert_status(&status).await {
            Ok(saved) => saved,
            Err(store_err) => {
                let err = SyncError::from(store_err);
                warn!(
                    entity_id = %cx.entity_id(),
                    section = %cx.section(),
                    error = %err,
                    "Failed to record section update"
                );
                // The running marker was already persisted; clear it and
                // report the attempt as failed.
                self.write_failure(prior, cx.entity_id(), cx.section(), &err)
                    .await;
                return Err(err);
            }
        };
        debug!(
            entity_id = %cx.entity_id(),
            section = %cx.section(),
            applied = outcome.applied,
            "Section status recorded"
        );
        self.publish(UpdatePhase::Succeeded, saved);
        Ok(outcome.changed)
    }

    async fn record_failure(
        &self,
        prior: Option<SectionStatus>,
        entity_id: EntityId,
        section: Section,
        err: &SyncError,
    ) {
        if err.is_recordable() {
            self.write_failure(prior, entity_id, section, err).await;
        }
    }

    /// Best effort: a failure to record the error is logged and never
    /// replaces the error that caused it.
    async fn write_failure(
        &self,
        prior: Option<SectionStatus>,
        entity_id: EntityId,
        section: Section,
        err: &SyncError,
    ) {
        let now = self.clock.utc_now();
        let message = err.to_string();
        let status = match self
            .store
            .set_error(entity_id, section, &message, now)
            .await
        {
            Ok(status) => status,
            Err(store_err) => {
                warn!(
                    entity_id = %entity_id,
                    section = %section,
                    error = %store_err,
                    "Failed to record section update error"
                );
                let mut status = prior.unwrap_or_else(|| {
                    SectionStatus::new(entity_id, section, now)
                });
                status.error_message = message;
                status.started_at = None;
                status.updated_at = now;
                status
            }
        };
        self.publish(UpdatePhase::Failed, status);
    }

    fn publish(&self, phase: UpdatePhase, status: SectionStatus) {
        if self.notifiers.is_empty() {
            return;
        }
        let event = StatusEvent::new(phase, status);
        for notifier in &self.notifiers {
            notifier.notify(&event);
        }
    }
}

use std::sync::Arc;

use sectionsync_model::{EntityId, ModelError, Section};
use thiserror::Error;

/// Error type accepted from externally supplied fetchers, updaters and
/// credential providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared form of [`BoxError`] so a single failure can be handed to every
/// caller waiting on the same update.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by status store adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "postgres")]
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt status row for entity {entity_id}: {source}")]
    Corrupt {
        entity_id: EntityId,
        #[source]
        source: ModelError,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure of a section update.
///
/// Cloneable so that every caller collapsed onto one in-flight update
/// observes the very same error.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("no pipeline registered for section {0}")]
    UnregisteredSection(Section),

    #[error("invalid update request: {0}")]
    InvalidRequest(String),

    #[error("no valid credential for entity {entity_id}: {source}")]
    Credential {
        entity_id: EntityId,
        #[source]
        source: SharedError,
    },

    #[error("fetching {section} for entity {entity_id} failed: {source}")]
    Fetch {
        entity_id: EntityId,
        section: Section,
        #[source]
        source: SharedError,
    },

    #[error("hashing {section} payload failed: {source}")]
    Hash {
        section: Section,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("updating {section} for entity {entity_id} failed: {source}")]
    Update {
        entity_id: EntityId,
        section: Section,
        #[source]
        source: SharedError,
    },

    #[error("status store error: {0}")]
    Store(#[source] Arc<StoreError>),

    #[error("update of {section} for entity {entity_id} was cancelled")]
    Cancelled { entity_id: EntityId, section: Section },

    #[error("update task panicked: {0}")]
    Panicked(String),
}

impl SyncError {
    pub fn credential(entity_id: EntityId, source: BoxError) -> Self {
        SyncError::Credential {
            entity_id,
            source: Arc::from(source),
        }
    }

    pub fn fetch(
        entity_id: EntityId,
        section: Section,
        source: BoxError,
    ) -> Self {
        SyncError::Fetch {
            entity_id,
            section,
            source: Arc::from(source),
        }
    }

    pub fn update(
        entity_id: EntityId,
        section: Section,
        source: BoxError,
    ) -> Self {
        SyncError::Update {
            entity_id,
            section,
            source: Arc::from(source),
        }
    }

    /// Whether the failure belongs to the attempt itself and should be
    /// written to the section's status as its last error.
    pub fn is_recordable(&self) -> bool {
        matches!(
            self,
            SyncError::Fetch { .. }
                | SyncError::Hash { .. }
                | SyncError::Update { .. }
                | SyncError::Cancelled { .. }
                | SyncError::Panicked(_)
        )
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Store(Arc::new(err))
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

//! Keeps locally cached sections of remote data fresh.
//!
//! Each section of an entity is refreshed on its own schedule: an update is
//! skipped while the last successful one is younger than the section's TTL,
//! concurrent requests for the same section collapse into one execution, and
//! the fetched payload is only written when its content hash changed. Every
//! attempt is reflected in a durable [`SectionStatus`] record and announced
//! to registered [`StatusNotifier`]s.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use sectionsync_core::{
//! #     BoxError, InMemoryStatusStore, Orchestrator, PipelineRegistry,
//! #     StaticCredentialProvider, UpdateRequest, fetch_fn, update_fn,
//! # };
//! # use sectionsync_model::GeneralSection;
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = PipelineRegistry::new().with(
//!     GeneralSection::MarketPrices,
//!     fetch_fn(|_, _| async { Ok::<_, BoxError>(vec![("tritanium", 4.2)]) }),
//!     update_fn(|_, _, _prices: Vec<(&'static str, f64)>| async {
//!         Ok::<(), BoxError>(())
//!     }),
//! );
//! let orchestrator = Orchestrator::builder(
//!     Arc::new(InMemoryStatusStore::new()),
//!     Arc::new(StaticCredentialProvider::new()),
//! )
//! .registry(registry)
//! .build();
//!
//! let changed = orchestrator
//!     .update_section(UpdateRequest::general(GeneralSection::MarketPrices))
//!     .await?;
//! # let _ = changed;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod credentials;
pub mod error;
pub mod events;
pub mod hashing;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod singleflight;
pub mod store;
pub mod time;

pub use credentials::{
    Credential, CredentialError, CredentialProvider, StaticCredentialProvider,
};
pub use error::{BoxError, StoreError, StoreResult, SyncError, SyncResult};
pub use events::{InProcStatusBus, StatusCache, StatusNotifier};
pub use hashing::{ContentHash, ContentHasher};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, UpdateRequest};
pub use pipeline::{
    ApplyPlan, FetchContext, PipelineOutcome, SectionFetcher, SectionPipeline,
    SectionUpdater, TypedPipeline, fetch_fn, update_fn,
};
pub use registry::PipelineRegistry;
pub use sectionsync_model::{SectionStatus, StatusEvent};
pub use singleflight::SingleFlight;
#[cfg(feature = "postgres")]
pub use store::PostgresStatusStore;
pub use store::{InMemoryStatusStore, SectionStatusStore};
pub use time::{SystemTimeProvider, TimeProvider, VirtualTimeProvider};

#[cfg(feature = "postgres")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

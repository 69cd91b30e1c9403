//! Core data model definitions shared across sectionsync crates.
//!
//! Everything here is plain data: the compiled-in section catalogue with its
//! refresh TTLs, entity identifiers, the persisted [`SectionStatus`] record
//! and the events emitted while a section is being refreshed.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use ::chrono;

pub mod error;
pub mod events;
pub mod ids;
pub mod section;
pub mod status;

pub use error::{ModelError, Result as ModelResult};
pub use events::{StatusEvent, UpdatePhase};
pub use ids::EntityId;
pub use section::{
    CharacterSection, CorporationSection, GeneralSection, Section,
    SectionFamily,
};
pub use status::{SectionStatus, StatusSummary};

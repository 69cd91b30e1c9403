use chrono::{DateTime, Utc};

use crate::ids::EntityId;
use crate::section::Section;
use crate::status::SectionStatus;

/// Stage of a section update an event reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UpdatePhase {
    Started,
    Succeeded,
    Failed,
}

/// Live status notification carrying the status record as it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEvent {
    pub phase: UpdatePhase,
    pub status: SectionStatus,
}

impl StatusEvent {
    pub fn new(phase: UpdatePhase, status: SectionStatus) -> Self {
        Self { phase, status }
    }

    pub fn entity_id(&self) -> EntityId {
        self.status.entity_id
    }

    pub fn section(&self) -> Section {
        self.status.section
    }

    pub fn error_message(&self) -> &str {
        &self.status.error_message
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.status.completed_at
    }
}

use chrono::{DateTime, TimeDelta, Utc};

use crate::ids::EntityId;
use crate::section::{Section, SectionFamily};

/// Persisted update status of one section for one entity.
///
/// There is exactly one record per `(entity_id, section)`. A missing record
/// means the section was never attempted and is always treated as expired.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionStatus {
    pub entity_id: EntityId,
    pub section: Section,
    /// Digest of the last successfully fetched payload. Empty until the
    /// first successful update.
    pub content_hash: String,
    /// When the last update completed successfully. Staleness is measured
    /// from here.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the content hash last changed.
    pub changed_at: Option<DateTime<Utc>>,
    /// Set while an update is in flight.
    pub started_at: Option<DateTime<Utc>>,
    /// Last failure message. Empty means healthy.
    pub error_message: String,
    pub updated_at: DateTime<Utc>,
}

impl SectionStatus {
    /// Blank record for a section that has never completed.
    pub fn new(entity_id: EntityId, section: Section, now: DateTime<Utc>) -> Self {
        Self {
            entity_id,
            section,
            content_hash: String::new(),
            completed_at: None,
            changed_at: None,
            started_at: None,
            error_message: String::new(),
            updated_at: now,
        }
    }

    pub fn has_error(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// True until the first successful update.
    pub fn is_missing(&self) -> bool {
        self.completed_at.is_none()
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Point in time after which the data is stale.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let completed_at = self.completed_at?;
        let ttl = TimeDelta::from_std(self.section.ttl())
            .unwrap_or(TimeDelta::MAX);
        completed_at.checked_add_signed(ttl)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(deadline) => now > deadline,
            None => self.completed_at.is_none(),
        }
    }

    /// Completed at least once and still within its TTL.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        !self.is_missing() && !self.is_expired(now)
    }
}

/// Aggregated health of all sections of one family for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSummary {
    pub current: usize,
    pub errors: usize,
    pub missing: usize,
    pub running: bool,
    pub total: usize,
}

impl StatusSummary {
    /// Summarises `statuses` against the full section list of `family`.
    /// Sections without a record count as missing.
    pub fn from_statuses<'a>(
        family: SectionFamily,
        statuses: impl IntoIterator<Item = &'a SectionStatus>,
        now: DateTime<Utc>,
    ) -> Self {
        let total = family.sections().len();
        let mut summary = StatusSummary {
            total,
            ..StatusSummary::default()
        };
        let mut seen = 0;
        for status in statuses {
            if status.section.family() != family {
                continue;
            }
            seen += 1;
            if status.has_error() {
                summary.errors += 1;
            } else if status.is_missing() {
                summary.missing += 1;
            } else if status.is_current(now) {
                summary.current += 1;
            }
            summary.running |= status.is_running();
        }
        summary.missing += total.saturating_sub(seen);
        summary
    }

    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }

    /// Share of sections that are current, between 0 and 1.
    pub fn completion(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f32 / self.total as f32
    }
}

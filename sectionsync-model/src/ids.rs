use std::fmt;

/// Identifier of the owner a section is tracked for (a character, a
/// corporation, or the shared pseudo-entity for general sections).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(pub i64);

impl EntityId {
    /// Reserved owner for sections that are not tied to an account.
    pub const GENERAL: EntityId = EntityId(0);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    pub const fn is_general(&self) -> bool {
        self.0 == Self::GENERAL.0
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        Self(i64::from(id))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

use std::fmt;
use std::sync::Arc;

use sectionsync_model::Section;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::SyncError;

/// Hex encoded SHA-256 digest of a section payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ContentHash {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Computes stable digests of fetched payloads.
///
/// Payloads go through `serde_json::Value` first and object keys are
/// re-ordered, so two payloads that serialize to the same logical document
/// produce the same hash regardless of map iteration order. Sequence order
/// is significant. The section key is mixed into the digest so identical
/// payloads of different sections never collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    pub fn new() -> Self {
        Self
    }

    pub fn hash<T>(
        &self,
        section: Section,
        payload: &T,
    ) -> Result<ContentHash, SyncError>
    where
        T: Serialize + ?Sized,
    {
        let hash_error = |err: serde_json::Error| SyncError::Hash {
            section,
            source: Arc::new(err),
        };

        let value = serde_json::to_value(payload).map_err(hash_error)?;
        let bytes =
            serde_json::to_vec(&canonicalize(value)).map_err(hash_error)?;

        let mut hasher = Sha256::new();
        hasher.update(section.key().as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
        Ok(ContentHash(hex::encode(hasher.finalize())))
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(canonicalize).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectionsync_model::{CharacterSection, GeneralSection};
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Skill {
        id: i32,
        level: u8,
    }

    fn skills() -> Section {
        CharacterSection::Skills.into()
    }

    #[test]
    fn equal_payloads_hash_equal() {
        let hasher = ContentHasher::new();
        let a = hasher
            .hash(skills(), &vec![Skill { id: 1, level: 5 }])
            .unwrap();
        let b = hasher
            .hash(skills(), &vec![Skill { id: 1, level: 5 }])
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn map_insertion_order_does_not_matter() {
        let hasher = ContentHasher::new();
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for id in 0..64 {
            first.insert(format!("k{id}"), id);
        }
        for id in (0..64).rev() {
            second.insert(format!("k{id}"), id);
        }
        assert_eq!(
            hasher.hash(skills(), &first).unwrap(),
            hasher.hash(skills(), &second).unwrap()
        );
    }

    #[test]
    fn sequence_order_is_significant() {
        let hasher = ContentHasher::new();
        let a = hasher.hash(skills(), &[1, 2, 3]).unwrap();
        let b = hasher.hash(skills(), &[3, 2, 1]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_content_hashes_differently() {
        let hasher = ContentHasher::new();
        let a = hasher.hash(skills(), &Skill { id: 1, level: 4 }).unwrap();
        let b = hasher.hash(skills(), &Skill { id: 1, level: 5 }).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_and_absent_payloads_are_deterministic() {
        let hasher = ContentHasher::new();
        let none: Option<Vec<i32>> = None;
        let empty: Vec<i32> = Vec::new();
        assert_eq!(
            hasher.hash(skills(), &none).unwrap(),
            hasher.hash(skills(), &none).unwrap()
        );
        assert_eq!(
            hasher.hash(skills(), &empty).unwrap(),
            hasher.hash(skills(), &empty).unwrap()
        );
        assert_ne!(
            hasher.hash(skills(), &none).unwrap(),
            hasher.hash(skills(), &empty).unwrap()
        );
    }

    #[test]
    fn section_is_part_of_the_digest() {
        let hasher = ContentHasher::new();
        let a = hasher.hash(skills(), &42).unwrap();
        let b = hasher.hash(GeneralSection::Types.into(), &42).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unserializable_payload_is_a_hash_error() {
        let mut payload = HashMap::new();
        payload.insert((1, 2), "tuple keys are not valid JSON keys");
        let err = ContentHasher::new().hash(skills(), &payload).unwrap_err();
        assert!(matches!(err, SyncError::Hash { section, .. } if section == skills()));
    }
}

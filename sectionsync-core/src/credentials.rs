use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use sectionsync_model::EntityId;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::BoxError;

/// Access token good for the scopes it was issued with.
#[derive(Clone)]
pub struct Credential {
    entity_id: EntityId,
    access_token: Zeroizing<String>,
    scopes: BTreeSet<String>,
}

impl Credential {
    pub fn new(
        entity_id: EntityId,
        access_token: impl Into<String>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            entity_id,
            access_token: Zeroizing::new(access_token.into()),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn has_scopes(&self, required: &[&str]) -> bool {
        required.iter().all(|scope| self.scopes.contains(*scope))
    }

    fn missing_scopes(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|scope| !self.scopes.contains(**scope))
            .map(|scope| scope.to_string())
            .collect()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("entity_id", &self.entity_id)
            .field("access_token", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Supplies credentials for sections that need an authenticated fetch.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a credential for `entity_id` valid for all `scopes`.
    async fn valid_credential(
        &self,
        entity_id: EntityId,
        scopes: &[&'static str],
    ) -> Result<Credential, BoxError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no credential stored for entity {0}")]
    Missing(EntityId),
    #[error("credential for entity {entity_id} lacks scopes: {}", .scopes.join(", "))]
    MissingScopes {
        entity_id: EntityId,
        scopes: Vec<String>,
    },
}

/// Credential provider over a fixed set of tokens held in memory.
#[derive(Debug, Default)]
pub struct StaticCredentialProvider {
    credentials: DashMap<EntityId, Credential>,
}

impl StaticCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, credential: Credential) {
        self.credentials.insert(credential.entity_id(), credential);
    }

    pub fn with(self, credential: Credential) -> Self {
        self.insert(credential);
        self
    }

    pub fn remove(&self, entity_id: EntityId) -> Option<Credential> {
        self.credentials.remove(&entity_id).map(|(_, c)| c)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn valid_credential(
        &self,
        entity_id: EntityId,
        scopes: &[&'static str],
    ) -> Result<Credential, BoxError> {
        let credential = self
            .credentials
            .get(&entity_id)
            .map(|entry| entry.value().clone())
            .ok_or(CredentialError::Missing(entity_id))?;

        let missing = credential.missing_scopes(scopes);
        if !missing.is_empty() {
            return Err(CredentialError::MissingScopes {
                entity_id,
                scopes: missing,
            }
            .into());
        }
        Ok(credential)
    }
}

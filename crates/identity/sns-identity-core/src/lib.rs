//! Core identity types and the user provisioning seam.
//!
//! The OIDC engine emits a [`ValidatedIdentity`] once a provider's ID token
//! has been verified; a [`UserProvisioner`] maps that identity to a stored
//! [`User`]. The provider's `sub` claim, not the email address, is the
//! canonical user key: providers may let users change their email.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("user already provisioned for {provider_id} subject {subject}")]
    AlreadyProvisioned {
        provider_id: ProviderId,
        subject: String,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Identity provider discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Google,
    Yahoo,
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::Google => write!(f, "google"),
            ProviderId::Yahoo => write!(f, "yahoo"),
        }
    }
}

/// Identity asserted by a provider and verified by the OIDC engine.
///
/// Only produced after signature and claim validation succeed; the fields
/// are authoritative from that point on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedIdentity {
    pub provider_id: ProviderId,
    /// Provider-assigned stable identifier (the `sub` claim).
    pub subject: String,
    pub email: String,
}

/// A provisioned user record, keyed by `(provider_id, subject)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub provider_id: ProviderId,
    pub subject: String,
    pub email: String,
}

/// Consumes verified identities and turns them into user records.
///
/// Persistence lives behind this trait; the engine only hands over a
/// [`ValidatedIdentity`] and never observes storage details.
#[async_trait]
pub trait UserProvisioner: Send + Sync {
    async fn provision(&self, identity: ValidatedIdentity) -> ProvisionResult<User>;

    async fn find_by_subject(
        &self,
        provider_id: ProviderId,
        subject: &str,
    ) -> ProvisionResult<Option<User>>;
}

/// In-memory implementation of [`UserProvisioner`] for tests and demos.
pub struct InMemoryUserStore {
    users: RwLock<HashMap<(ProviderId, String), User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserProvisioner for InMemoryUserStore {
    async fn provision(&self, identity: ValidatedIdentity) -> ProvisionResult<User> {
        let mut users = self.users.write().await;
        let key = (identity.provider_id, identity.subject.clone());

        if users.contains_key(&key) {
            return Err(ProvisionError::AlreadyProvisioned {
                provider_id: identity.provider_id,
                subject: identity.subject,
            });
        }

        let user = User {
            id: users.len() as i64 + 1,
            provider_id: identity.provider_id,
            subject: identity.subject,
            email: identity.email,
        };
        users.insert(key, user.clone());

        Ok(user)
    }

    async fn find_by_subject(
        &self,
        provider_id: ProviderId,
        subject: &str,
    ) -> ProvisionResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&(provider_id, subject.to_string())).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ValidatedIdentity {
        ValidatedIdentity {
            provider_id: ProviderId::Google,
            subject: "108976543210987654321".to_string(),
            email: "user@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn provisions_a_new_user() {
        let store = InMemoryUserStore::new();

        let user = store.provision(identity()).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.provider_id, ProviderId::Google);
        assert_eq!(user.subject, "108976543210987654321");
        assert_eq!(user.email, "user@example.com");

        let found = store
            .find_by_subject(ProviderId::Google, "108976543210987654321")
            .await
            .unwrap();
        assert_eq!(found, Some(user));
    }

    #[tokio::test]
    async fn rejects_duplicate_subject_for_same_provider() {
        let store = InMemoryUserStore::new();

        store.provision(identity()).await.unwrap();
        let result = store.provision(identity()).await;

        assert!(matches!(
            result,
            Err(ProvisionError::AlreadyProvisioned { .. })
        ));
    }

    #[tokio::test]
    async fn same_subject_under_different_provider_is_distinct() {
        let store = InMemoryUserStore::new();

        store.provision(identity()).await.unwrap();

        let mut yahoo = identity();
        yahoo.provider_id = ProviderId::Yahoo;
        let user = store.provision(yahoo).await.unwrap();
        assert_eq!(user.provider_id, ProviderId::Yahoo);
        assert_eq!(user.id, 2);
    }

    #[test]
    fn provider_id_display() {
        assert_eq!(ProviderId::Google.to_string(), "google");
        assert_eq!(ProviderId::Yahoo.to_string(), "yahoo");
    }
}

//! Policy document persistence.

use async_trait::async_trait;
use shelf_gate_core::Result;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::document::PolicyDocument;
use crate::error::PolicyError;

/// Storage for policy documents in the policy-enforcement layer.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Fetches a policy by name. A missing policy is `Ok(None)`.
    async fn get(&self, name: &str) -> Result<Option<PolicyDocument>, PolicyError>;

    async fn list(&self) -> Result<Vec<PolicyDocument>, PolicyError>;

    async fn create(&self, document: &PolicyDocument) -> Result<PolicyDocument, PolicyError>;

    /// Replaces an existing policy. Fails with `NotFound` if it does not exist.
    async fn replace(&self, document: &PolicyDocument) -> Result<PolicyDocument, PolicyError>;
}

/// How [`upsert`] persisted a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Replaced,
}

/// Replaces the named policy if it exists, otherwise creates it.
///
/// The stored object's resource version is carried over so the replace is
/// accepted. Any failure other than absence is returned to the caller.
///
/// # Errors
///
/// Errors from the underlying store.
#[instrument(skip(store, document), fields(policy = %document.name()))]
pub async fn upsert(
    store: &dyn PolicyStore,
    document: &PolicyDocument,
) -> Result<UpsertOutcome, PolicyError> {
    match store.get(document.name()).await? {
        Some(existing) => {
            let mut document = document.clone();
            document.metadata.resource_version = existing.metadata.resource_version;
            store.replace(&document).await?;
            debug!("Replaced policy");
            Ok(UpsertOutcome::Replaced)
        }
        None => {
            store.create(document).await?;
            debug!("Created policy");
            Ok(UpsertOutcome::Created)
        }
    }
}

/// In-process policy store for development and tests.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    documents: RwLock<BTreeMap<String, PolicyDocument>>,
}

impl MemoryPolicyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn get(&self, name: &str) -> Result<Option<PolicyDocument>, PolicyError> {
        Ok(self.documents.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<PolicyDocument>, PolicyError> {
        Ok(self.documents.read().await.values().cloned().collect())
    }

    async fn create(&self, document: &PolicyDocument) -> Result<PolicyDocument, PolicyError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(document.name()) {
            return Err(PolicyError::RequestFailed {
                details: format!("policy '{}' already exists", document.name()),
            }
            .into());
        }
        let mut stored = document.clone();
        stored.metadata.resource_version = Some("1".to_string());
        documents.insert(stored.metadata.name.clone(), stored.clone());
        Ok(stored)
    }

    async fn replace(&self, document: &PolicyDocument) -> Result<PolicyDocument, PolicyError> {
        let mut documents = self.documents.write().await;
        let Some(current) = documents.get(document.name()) else {
            return Err(PolicyError::NotFound {
                name: document.name().to_string(),
            }
            .into());
        };
        if current.metadata.resource_version != document.metadata.resource_version {
            return Err(PolicyError::RequestFailed {
                details: format!("policy '{}' was modified concurrently", document.name()),
            }
            .into());
        }

        let next_version = current
            .metadata
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        let mut stored = document.clone();
        stored.metadata.resource_version = Some(next_version.to_string());
        documents.insert(stored.metadata.name.clone(), stored.clone());
        Ok(stored)
    }
}

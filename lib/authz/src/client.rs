//! Kubernetes-backed policy store.
//!
//! Policies are `AuthorizationPolicy` custom resources. They are accessed as
//! dynamic objects and converted to [`PolicyDocument`] through their JSON form,
//! so no generated resource types are needed.

use async_trait::async_trait;
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams, PostParams};
use shelf_gate_core::Result;
use tracing::{debug, instrument};

use crate::document::{POLICY_GROUP, POLICY_KIND, POLICY_PLURAL, POLICY_VERSION, PolicyDocument};
use crate::error::PolicyError;
use crate::store::PolicyStore;

/// Policy store talking to the cluster API server.
#[derive(Clone)]
pub struct KubePolicyStore {
    api: Api<DynamicObject>,
    namespace: String,
}

impl KubePolicyStore {
    /// Connects using the ambient cluster configuration.
    ///
    /// In-cluster service account credentials are used when present, otherwise
    /// the local kubeconfig.
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` if no usable configuration is found.
    pub async fn connect(namespace: impl Into<String>) -> Result<Self, PolicyError> {
        let client = Client::try_default()
            .await
            .map_err(|e| PolicyError::ConnectionFailed {
                details: e.to_string(),
            })?;
        debug!("Kubernetes client initialized");
        Ok(Self::with_client(client, namespace))
    }

    #[must_use]
    pub fn with_client(client: Client, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let gvk = GroupVersionKind::gvk(POLICY_GROUP, POLICY_VERSION, POLICY_KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, POLICY_PLURAL);
        let api = Api::namespaced_with(client, &namespace, &resource);
        Self { api, namespace }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

fn request_failed(e: kube::Error) -> PolicyError {
    PolicyError::RequestFailed {
        details: e.to_string(),
    }
}

fn to_document(object: DynamicObject) -> std::result::Result<PolicyDocument, PolicyError> {
    let value = serde_json::to_value(object).map_err(|e| PolicyError::InvalidDocument {
        details: e.to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| PolicyError::InvalidDocument {
        details: e.to_string(),
    })
}

fn to_object(document: &PolicyDocument) -> std::result::Result<DynamicObject, PolicyError> {
    let value = serde_json::to_value(document).map_err(|e| PolicyError::InvalidDocument {
        details: e.to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| PolicyError::InvalidDocument {
        details: e.to_string(),
    })
}

#[async_trait]
impl PolicyStore for KubePolicyStore {
    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<Option<PolicyDocument>, PolicyError> {
        let object = self.api.get_opt(name).await.map_err(request_failed)?;
        match object {
            Some(object) => Ok(Some(to_document(object)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<PolicyDocument>, PolicyError> {
        let objects = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(request_failed)?;
        let mut documents = Vec::with_capacity(objects.items.len());
        for object in objects.items {
            documents.push(to_document(object)?);
        }
        Ok(documents)
    }

    #[instrument(skip(self, document), fields(policy = %document.name()))]
    async fn create(&self, document: &PolicyDocument) -> Result<PolicyDocument, PolicyError> {
        let object = to_object(document)?;
        let created = self
            .api
            .create(&PostParams::default(), &object)
            .await
            .map_err(request_failed)?;
        Ok(to_document(created)?)
    }

    #[instrument(skip(self, document), fields(policy = %document.name()))]
    async fn replace(&self, document: &PolicyDocument) -> Result<PolicyDocument, PolicyError> {
        let object = to_object(document)?;
        match self
            .api
            .replace(document.name(), &PostParams::default(), &object)
            .await
        {
            Ok(replaced) => Ok(to_document(replaced)?),
            Err(kube::Error::Api(err)) if err.code == 404 => Err(PolicyError::NotFound {
                name: document.name().to_string(),
            }
            .into()),
            Err(e) => Err(request_failed(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::projector::to_policy_document;
    use crate::types::{ManagedRole, PermissionGrid, Resource, Verb};

    #[test]
    fn document_converts_through_dynamic_object() {
        let mut grid = PermissionGrid::empty();
        grid.grant(ManagedRole::Verified, Verb::Add);
        let mut document = to_policy_document(Resource::Books, &grid, &PolicyConfig::default());
        document.metadata.resource_version = Some("7".to_string());

        let object = to_object(&document).expect("to object");
        assert_eq!(object.metadata.name.as_deref(), Some("books-policy"));
        assert_eq!(object.metadata.resource_version.as_deref(), Some("7"));
        assert!(object.data.get("spec").is_some());

        assert_eq!(to_document(object).expect("to document"), document);
    }
}

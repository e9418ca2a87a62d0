//! Declarative authorization policy documents.
//!
//! This is the shape of the policy-enforcement layer's `AuthorizationPolicy`
//! custom resource, limited to the fields this service reads and writes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const POLICY_GROUP: &str = "security.istio.io";
pub const POLICY_VERSION: &str = "v1beta1";
pub const POLICY_KIND: &str = "AuthorizationPolicy";
pub const POLICY_PLURAL: &str = "authorizationpolicies";

/// A namespaced authorization policy object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub api_version: String,
    pub kind: String,
    pub metadata: PolicyMetadata,
    #[serde(default)]
    pub spec: PolicySpec,
}

impl PolicyDocument {
    /// Creates an empty ALLOW policy for the given workload.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, app_label: &str) -> Self {
        Self {
            api_version: format!("{POLICY_GROUP}/{POLICY_VERSION}"),
            kind: POLICY_KIND.to_string(),
            metadata: PolicyMetadata {
                name: name.into(),
                namespace: Some(namespace.into()),
                resource_version: None,
            },
            spec: PolicySpec {
                selector: Some(WorkloadSelector {
                    match_labels: BTreeMap::from([("app".to_string(), app_label.to_string())]),
                }),
                action: Some("ALLOW".to_string()),
                rules: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Optimistic-concurrency token; carried from the stored object on replace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<WorkloadSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

/// One rule: who (`from`, `when`) may perform which operations (`to`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from: Vec<RuleFrom>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<RuleTo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFrom {
    #[serde(default)]
    pub source: Source,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub principals: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_principals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTo {
    #[serde(default)]
    pub operation: Operation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

/// A match on a request attribute, such as a token claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

//! Static per-resource projection settings.

use serde::Deserialize;

use crate::types::Resource;

/// Default claim path the enforcement layer matches role names against.
pub const DEFAULT_ROLE_CLAIM: &str = "request.auth.claims[resource_access][Istio][roles]";

/// Workload selector and path patterns for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceRules {
    /// Value of the `app` label selecting the workload serving the resource.
    pub app_label: String,
    /// Request paths every rule for this resource applies to.
    pub paths: Vec<String>,
}

/// Settings the projector needs beyond the grid itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_role_claim")]
    pub role_claim: String,
    #[serde(default = "default_books")]
    pub books: ResourceRules,
    #[serde(default = "default_reviews")]
    pub reviews: ResourceRules,
}

impl PolicyConfig {
    #[must_use]
    pub fn rules_for(&self, resource: Resource) -> &ResourceRules {
        match resource {
            Resource::Books => &self.books,
            Resource::Reviews => &self.reviews,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            role_claim: default_role_claim(),
            books: default_books(),
            reviews: default_reviews(),
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_role_claim() -> String {
    DEFAULT_ROLE_CLAIM.to_string()
}

fn default_books() -> ResourceRules {
    ResourceRules {
        app_label: "books-information".to_string(),
        paths: vec!["/books*".to_string()],
    }
}

fn default_reviews() -> ResourceRules {
    ResourceRules {
        app_label: "webserver".to_string(),
        paths: vec!["/books/*/reviews*".to_string()],
    }
}

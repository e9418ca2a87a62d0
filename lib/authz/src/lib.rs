//! Access policy management for shelf-gate.
//!
//! Administrators edit a permission grid per resource. This crate projects the
//! grid into the policy documents the policy-enforcement layer applies, parses
//! stored documents back into grids, and persists them with upsert semantics.
//!
//! Enforcement itself happens outside this service; nothing here decides
//! whether a request is allowed.

mod client;
mod config;
mod document;
mod error;
mod projector;
mod store;
mod types;

pub use client::KubePolicyStore;
pub use config::{DEFAULT_ROLE_CLAIM, PolicyConfig, ResourceRules};
pub use document::{
    Condition, Operation, PolicyDocument, PolicyMetadata, PolicySpec, Rule, RuleFrom, RuleTo,
    Source, WorkloadSelector,
};
pub use error::PolicyError;
pub use projector::{from_policy_document, to_policy_document};
pub use store::{MemoryPolicyStore, PolicyStore, UpsertOutcome, upsert};
pub use types::{ManagedRole, PermissionEntry, PermissionGrid, Resource, Verb};

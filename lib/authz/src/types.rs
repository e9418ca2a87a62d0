//! Permission grid types.
//!
//! An administrator edits a grid of `{role, resource, verb} -> granted`. The
//! grid covers two resources, three managed roles and three verbs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::PolicyError;

/// Resources guarded by the policy-enforcement layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    /// Catalog items.
    Books,
    /// Reviews of catalog items.
    Reviews,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Books, Resource::Reviews];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Reviews => "reviews",
        }
    }

    /// Name of the policy object holding this resource's rules.
    #[must_use]
    pub fn policy_name(&self) -> String {
        format!("{}-policy", self.as_str())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "books" => Ok(Self::Books),
            "reviews" => Ok(Self::Reviews),
            other => Err(PolicyError::UnknownResource {
                name: other.to_string(),
            }),
        }
    }
}

/// Roles whose access is managed through the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManagedRole {
    User,
    Verified,
    Moderator,
}

impl ManagedRole {
    pub const ALL: [ManagedRole; 3] = [
        ManagedRole::User,
        ManagedRole::Verified,
        ManagedRole::Moderator,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Verified => "verified",
            Self::Moderator => "moderator",
        }
    }

    /// Parses a role name, returning `None` for roles the grid does not manage.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == name)
    }
}

/// Verbs an administrator can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    View,
    Add,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 3] = [Verb::View, Verb::Add, Verb::Delete];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Add => "add",
            Self::Delete => "delete",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.as_str() == name)
    }

    /// The HTTP method this verb permits.
    #[must_use]
    pub fn http_method(&self) -> &'static str {
        match self {
            Self::View => "GET",
            Self::Add => "POST",
            Self::Delete => "DELETE",
        }
    }

    /// Maps an HTTP method back to a verb; other methods have no verb.
    #[must_use]
    pub fn from_http_method(method: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.http_method().eq_ignore_ascii_case(method))
    }
}

/// One cell of the grid as exchanged with the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub role: String,
    pub permission: String,
    pub granted: bool,
}

/// The grant grid for one resource. Cells not granted are denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionGrid {
    granted: BTreeSet<(ManagedRole, Verb)>,
}

impl PermissionGrid {
    /// A grid with nothing granted.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, role: ManagedRole, verb: Verb) {
        self.granted.insert((role, verb));
    }

    pub fn revoke(&mut self, role: ManagedRole, verb: Verb) {
        self.granted.remove(&(role, verb));
    }

    #[must_use]
    pub fn is_granted(&self, role: ManagedRole, verb: Verb) -> bool {
        self.granted.contains(&(role, verb))
    }

    /// Verbs granted to a role, in `view, add, delete` order.
    #[must_use]
    pub fn verbs_for(&self, role: ManagedRole) -> Vec<Verb> {
        Verb::ALL
            .into_iter()
            .filter(|verb| self.is_granted(role, *verb))
            .collect()
    }

    /// Builds a grid from browser-submitted entries.
    ///
    /// Later entries for the same cell override earlier ones.
    ///
    /// # Errors
    ///
    /// `PolicyError::InvalidInput` for a role or permission the grid does not know.
    pub fn from_entries(entries: &[PermissionEntry]) -> Result<Self, PolicyError> {
        let mut grid = Self::empty();
        for entry in entries {
            let role = ManagedRole::parse(&entry.role).ok_or_else(|| PolicyError::InvalidInput {
                details: format!("unknown role '{}'", entry.role),
            })?;
            let verb = Verb::parse(&entry.permission).ok_or_else(|| PolicyError::InvalidInput {
                details: format!("unknown permission '{}'", entry.permission),
            })?;
            if entry.granted {
                grid.grant(role, verb);
            } else {
                grid.revoke(role, verb);
            }
        }
        Ok(grid)
    }

    /// Every cell of the grid, granted or not, ordered by role then verb.
    #[must_use]
    pub fn to_entries(&self) -> Vec<PermissionEntry> {
        ManagedRole::ALL
            .into_iter()
            .flat_map(|role| {
                Verb::ALL.into_iter().map(move |verb| PermissionEntry {
                    role: role.as_str().to_string(),
                    permission: verb.as_str().to_string(),
                    granted: self.is_granted(role, verb),
                })
            })
            .collect()
    }
}

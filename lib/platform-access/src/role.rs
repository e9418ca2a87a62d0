//! Role sets.
//!
//! Roles are plain names owned by the identity provider (`admin`, `user`,
//! `verified`, `moderator`, ...). A `RoleSet` is ordered so its display string
//! is stable, but comparisons are always set comparisons.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The role that unlocks administrative operations.
pub const ADMIN_ROLE: &str = "admin";

/// Set of role names held by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: BTreeSet<String>,
}

impl RoleSet {
    /// Creates an empty role set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a role set from role names, dropping duplicates and blanks.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: names
                .into_iter()
                .map(Into::into)
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    /// Returns true if the set contains the given role.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns true if the set contains the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.contains(ADMIN_ROLE)
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterates over role names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    /// Returns the union of two role sets.
    #[must_use]
    pub fn union(&self, other: &RoleSet) -> RoleSet {
        Self {
            roles: self.roles.union(&other.roles).cloned().collect(),
        }
    }

    /// Adds a role to the set.
    pub fn insert(&mut self, role: impl Into<String>) {
        let role = role.into();
        if !role.is_empty() {
            self.roles.insert(role);
        }
    }

    /// Returns the roles joined with `-`, for display only.
    ///
    /// Never compare display strings to detect role changes; compare the sets.
    #[must_use]
    pub fn display(&self) -> String {
        self.roles.iter().cloned().collect::<Vec<_>>().join("-")
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_names(iter)
    }
}

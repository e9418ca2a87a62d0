//! Projection between permission grids and policy documents.
//!
//! Each role with at least one granted verb becomes one rule. The rule
//! matches the role through a claim condition and allows the HTTP methods of
//! its verbs on the resource's configured paths. Parsing is the inverse and
//! ignores anything it does not recognize, so documents edited by hand still
//! load.

use crate::config::PolicyConfig;
use crate::document::{Condition, Operation, PolicyDocument, Rule, RuleFrom, RuleTo, Source};
use crate::types::{ManagedRole, PermissionGrid, Resource, Verb};

/// Builds the policy document enforcing `grid` on `resource`.
#[must_use]
pub fn to_policy_document(
    resource: Resource,
    grid: &PermissionGrid,
    config: &PolicyConfig,
) -> PolicyDocument {
    let rules = config.rules_for(resource);
    let mut document = PolicyDocument::new(
        resource.policy_name(),
        config.namespace.clone(),
        &rules.app_label,
    );

    for role in ManagedRole::ALL {
        let verbs = grid.verbs_for(role);
        if verbs.is_empty() {
            continue;
        }

        document.spec.rules.push(Rule {
            from: vec![RuleFrom {
                source: Source {
                    request_principals: vec!["*".to_string()],
                    ..Source::default()
                },
            }],
            to: vec![RuleTo {
                operation: Operation {
                    methods: verbs.iter().map(|v| v.http_method().to_string()).collect(),
                    paths: rules.paths.clone(),
                },
            }],
            when: vec![Condition {
                key: config.role_claim.clone(),
                values: vec![role.as_str().to_string()],
            }],
        });
    }

    document
}

/// Reads the grid a policy document enforces.
///
/// Cells not covered by any rule are not granted. Only conditions on the
/// configured role claim name roles.
#[must_use]
pub fn from_policy_document(document: &PolicyDocument, config: &PolicyConfig) -> PermissionGrid {
    let mut grid = PermissionGrid::empty();

    for rule in &document.spec.rules {
        let roles = rule_roles(rule, &config.role_claim);
        let verbs: Vec<Verb> = rule
            .to
            .iter()
            .flat_map(|to| &to.operation.methods)
            .filter_map(|method| Verb::from_http_method(method))
            .collect();

        for role in &roles {
            for verb in &verbs {
                grid.grant(*role, *verb);
            }
        }
    }

    grid
}

/// Roles a rule applies to.
///
/// Claim conditions take precedence. Older documents matched roles through
/// service-account principals, whose last path segment is the role name.
fn rule_roles(rule: &Rule, role_claim: &str) -> Vec<ManagedRole> {
    let from_claims: Vec<ManagedRole> = rule
        .when
        .iter()
        .filter(|condition| condition.key == role_claim)
        .flat_map(|condition| &condition.values)
        .filter_map(|value| ManagedRole::parse(value))
        .collect();
    if !from_claims.is_empty() {
        return from_claims;
    }

    rule.from
        .iter()
        .flat_map(|from| &from.source.principals)
        .filter_map(|principal| principal.rsplit('/').next())
        .filter_map(ManagedRole::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grid_from_bits(bits: u16) -> PermissionGrid {
        let mut grid = PermissionGrid::empty();
        let cells = ManagedRole::ALL
            .into_iter()
            .flat_map(|role| Verb::ALL.into_iter().map(move |verb| (role, verb)));
        for (i, (role, verb)) in cells.enumerate() {
            if bits & (1 << i) != 0 {
                grid.grant(role, verb);
            }
        }
        grid
    }

    #[test]
    fn every_grid_survives_projection() {
        let config = PolicyConfig::default();
        for resource in Resource::ALL {
            for bits in 0..512u16 {
                let grid = grid_from_bits(bits);
                let document = to_policy_document(resource, &grid, &config);
                assert_eq!(
                    from_policy_document(&document, &config),
                    grid,
                    "bits {bits:09b}"
                );
            }
        }
    }

    #[test]
    fn one_rule_per_role_with_grants() {
        let mut grid = PermissionGrid::empty();
        grid.grant(ManagedRole::Moderator, Verb::Delete);
        grid.grant(ManagedRole::Moderator, Verb::View);
        grid.grant(ManagedRole::User, Verb::View);

        let document = to_policy_document(Resource::Reviews, &grid, &PolicyConfig::default());

        assert_eq!(document.name(), "reviews-policy");
        assert_eq!(document.spec.rules.len(), 2);
        let moderator = &document.spec.rules[1];
        assert_eq!(moderator.to[0].operation.methods, vec!["GET", "DELETE"]);
        assert_eq!(moderator.to[0].operation.paths, vec!["/books/*/reviews*"]);
        assert_eq!(moderator.when[0].values, vec!["moderator"]);
    }

    #[test]
    fn empty_grid_has_no_rules() {
        let document =
            to_policy_document(Resource::Books, &PermissionGrid::empty(), &PolicyConfig::default());
        assert!(document.spec.rules.is_empty());
        assert_eq!(
            document.spec.selector.as_ref().map(|s| s.match_labels["app"].as_str()),
            Some("books-information")
        );
    }

    #[test]
    fn parses_principal_based_rules() {
        let document: PolicyDocument = serde_json::from_value(json!({
            "apiVersion": "security.istio.io/v1beta1",
            "kind": "AuthorizationPolicy",
            "metadata": {"name": "books-policy"},
            "spec": {"rules": [{
                "from": [{"source": {"principals": ["cluster.local/ns/default/sa/verified"]}}],
                "to": [{"operation": {"methods": ["GET", "POST", "PATCH"]}}]
            }]}
        }))
        .expect("deserialize");

        let grid = from_policy_document(&document, &PolicyConfig::default());

        assert_eq!(
            grid.verbs_for(ManagedRole::Verified),
            vec![Verb::View, Verb::Add]
        );
        assert!(grid.verbs_for(ManagedRole::User).is_empty());
    }

    #[test]
    fn ignores_unknown_roles_and_foreign_conditions() {
        let document: PolicyDocument = serde_json::from_value(json!({
            "apiVersion": "security.istio.io/v1beta1",
            "kind": "AuthorizationPolicy",
            "metadata": {"name": "books-policy"},
            "spec": {"rules": [
                {
                    "to": [{"operation": {"methods": ["DELETE"]}}],
                    "when": [{
                        "key": "request.auth.claims[resource_access][Istio][roles]",
                        "values": ["admin", "user"]
                    }]
                },
                {
                    "to": [{"operation": {"methods": ["POST"]}}],
                    "when": [{"key": "request.auth.claims[groups]", "values": ["verified"]}]
                },
                {
                    "to": [{"operation": {"methods": ["GET"]}}],
                    "when": [{"key": "source.ip", "values": ["moderator"]}]
                }
            ]}
        }))
        .expect("deserialize");

        let grid = from_policy_document(&document, &PolicyConfig::default());

        assert_eq!(grid.verbs_for(ManagedRole::User), vec![Verb::Delete]);
        assert!(grid.verbs_for(ManagedRole::Verified).is_empty());
        assert!(grid.verbs_for(ManagedRole::Moderator).is_empty());
    }

    #[test]
    fn custom_role_claim_survives_projection() {
        let config = PolicyConfig {
            role_claim: "request.auth.claims[groups]".to_string(),
            ..PolicyConfig::default()
        };
        let mut grid = PermissionGrid::empty();
        grid.grant(ManagedRole::Verified, Verb::Add);

        let document = to_policy_document(Resource::Books, &grid, &config);

        assert_eq!(from_policy_document(&document, &config), grid);
        assert_eq!(
            from_policy_document(&document, &PolicyConfig::default()),
            PermissionGrid::empty()
        );
    }
}

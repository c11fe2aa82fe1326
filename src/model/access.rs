//! 用户可达的授权子图与有效权限
//! A user's reachable grant subgraph and the effective permission view

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use utoipa::ToSchema;

use crate::model::entity::User;

/// 一个角色及其权限名称 / A role and the names of its permissions
#[derive(Debug, Clone, PartialEq)]
pub struct RoleGrant {
    pub role_id: i64,
    pub permissions: Vec<String>,
}

/// 用户所在的组以及该组的角色 / A group the user belongs to with its roles
#[derive(Debug, Clone, PartialEq)]
pub struct GroupGrant {
    pub group_id: i64,
    pub roles: Vec<RoleGrant>,
}

/// 固定两跳形状：user→role 与 user→group→role
/// Fixed two-hop shape: user→role and user→group→role
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccessGraph {
    pub user: User,
    pub direct_roles: Vec<RoleGrant>,
    pub groups: Vec<GroupGrant>,
}

/// 用户有效权限 / Effective permissions of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePermissions {
    pub user_id: i64,
    pub username: String,
    pub direct_permissions: Vec<String>,
    pub group_inherited_permissions: Vec<String>,
    /// 两者去重后的并集，按名称字典序排列
    /// Deduplicated union of both, sorted by name
    pub all_permissions: Vec<String>,
}

impl EffectivePermissions {
    pub fn from_graph(graph: &UserAccessGraph) -> Self {
        let direct_permissions = dedup_names(graph.direct_roles.iter());
        let group_inherited_permissions =
            dedup_names(graph.groups.iter().flat_map(|g| g.roles.iter()));

        let all_permissions = direct_permissions
            .iter()
            .chain(group_inherited_permissions.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            user_id: graph.user.user_id,
            username: graph.user.username.clone(),
            direct_permissions,
            group_inherited_permissions,
            all_permissions,
        }
    }
}

/// 按首次出现的顺序去重 / Dedup by name keeping first-seen order
fn dedup_names<'a>(roles: impl Iterator<Item = &'a RoleGrant>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for name in roles.flat_map(|r| r.permissions.iter()) {
        if seen.insert(name.as_str()) {
            names.push(name.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn grant(role_id: i64, names: &[&str]) -> RoleGrant {
        RoleGrant {
            role_id,
            permissions: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn graph(direct: Vec<RoleGrant>, groups: Vec<GroupGrant>) -> UserAccessGraph {
        UserAccessGraph {
            user: User {
                user_id: 3,
                username: "jane.smith".into(),
                email: "jane@example.com".into(),
                is_active: true,
                created_at: Utc::now(),
            },
            direct_roles: direct,
            groups,
        }
    }

    #[test]
    fn test_union_is_sorted_and_deduplicated() {
        let g = graph(
            vec![grant(3, &["user.write", "user.read", "report.view"])],
            vec![
                GroupGrant {
                    group_id: 2,
                    roles: vec![grant(4, &["user.read", "group.read"])],
                },
                GroupGrant {
                    group_id: 4,
                    roles: vec![grant(3, &["user.write", "user.read", "report.view"])],
                },
            ],
        );
        let eff = EffectivePermissions::from_graph(&g);
        assert_eq!(eff.direct_permissions, vec!["user.write", "user.read", "report.view"]);
        assert_eq!(
            eff.group_inherited_permissions,
            vec!["user.read", "group.read", "user.write", "report.view"]
        );
        assert_eq!(
            eff.all_permissions,
            vec!["group.read", "report.view", "user.read", "user.write"]
        );
    }

    #[test]
    fn test_user_without_grants() {
        let eff = EffectivePermissions::from_graph(&graph(vec![], vec![]));
        assert!(eff.direct_permissions.is_empty());
        assert!(eff.group_inherited_permissions.is_empty());
        assert!(eff.all_permissions.is_empty());
        assert_eq!(eff.username, "jane.smith");
    }

    #[test]
    fn test_group_only_permissions() {
        let g = graph(
            vec![],
            vec![GroupGrant {
                group_id: 3,
                roles: vec![grant(5, &["user.read", "role.read"])],
            }],
        );
        let eff = EffectivePermissions::from_graph(&g);
        assert!(eff.direct_permissions.is_empty());
        assert_eq!(eff.all_permissions, vec!["role.read", "user.read"]);
    }
}

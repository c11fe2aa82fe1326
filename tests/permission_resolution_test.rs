//! 有效权限解析与缓存失效集成测试
//! Effective permission resolution and cache invalidation integration tests

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rbac_admin::cache::{CacheError, CacheResult, CacheSettings, CacheStore, MemoryCache};
use rbac_admin::service::{AssignOutcome, DataSeeder, RbacServices, RemoveOutcome, ServiceError};
use rbac_admin::store::{MemoryStore, RbacStore};

/// 按名称查找演示数据中的 id / Name to id lookups over the demo dataset
struct Ids {
    users: HashMap<String, i64>,
    groups: HashMap<String, i64>,
    roles: HashMap<String, i64>,
    permissions: HashMap<String, i64>,
}

impl Ids {
    async fn load(store: &dyn RbacStore) -> Result<Self> {
        let snapshot = store.snapshot().await?;
        Ok(Self {
            users: snapshot.users.into_iter().map(|u| (u.username, u.user_id)).collect(),
            groups: snapshot.groups.into_iter().map(|g| (g.group_name, g.group_id)).collect(),
            roles: snapshot.roles.into_iter().map(|r| (r.role_name, r.role_id)).collect(),
            permissions: snapshot
                .permissions
                .into_iter()
                .map(|p| (p.permission_name, p.permission_id))
                .collect(),
        })
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
    services: RbacServices,
    ids: Ids,
}

async fn seeded() -> Result<Fixture> {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    DataSeeder::new(store.clone()).seed_if_empty().await?;
    let services = RbacServices::new(store.clone(), cache.clone(), CacheSettings::default());
    let ids = Ids::load(store.as_ref()).await?;
    Ok(Fixture {
        store,
        cache,
        services,
        ids,
    })
}

/// 始终失败的缓存后端 / A cache backend that always fails
struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    fn backend(&self) -> &'static str {
        "broken"
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn delete_by_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Err(CacheError::Backend("connection refused".into()))
    }
}

#[tokio::test]
async fn test_seeded_user_effective_permissions() -> Result<()> {
    let fx = seeded().await?;
    let jane = fx.ids.users["jane.smith"];

    let perms = fx.services.resolver.resolve_effective_permissions(jane).await?;
    assert_eq!(perms.user_id, jane);
    assert_eq!(perms.username, "jane.smith");
    assert_eq!(
        perms.all_permissions,
        vec!["group.read", "report.export", "report.view", "user.read", "user.write"]
    );
    // 直接角色 Manager；组 Sales(User) 与 Management(Manager)
    assert_eq!(perms.direct_permissions.len(), 5);
    assert_eq!(perms.group_inherited_permissions.len(), 5);
    assert!(fx.cache.contains_key(&format!("user:permissions:{}", jane)));
    Ok(())
}

#[tokio::test]
async fn test_unknown_user_is_not_found() -> Result<()> {
    let fx = seeded().await?;
    let err = fx
        .services
        .resolver
        .resolve_effective_permissions(9_999)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref msg) if msg == "User with ID 9999 not found"));
    Ok(())
}

#[tokio::test]
async fn test_assignment_is_idempotent() -> Result<()> {
    let fx = seeded().await?;
    let bob = fx.ids.users["bob.wilson"];
    let viewer = fx.ids.roles["Viewer"];

    let first = fx.services.assignments.assign_role_to_user(bob, viewer).await?;
    let second = fx.services.assignments.assign_role_to_user(bob, viewer).await?;
    assert_eq!(first, AssignOutcome::Assigned);
    assert_eq!(second, AssignOutcome::AlreadyExists);

    let perms = fx.services.resolver.resolve_effective_permissions(bob).await?;
    assert!(perms.all_permissions.contains(&"role.read".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_removing_permission_from_role_refreshes_members() -> Result<()> {
    let fx = seeded().await?;
    let jane = fx.ids.users["jane.smith"];
    let manager = fx.ids.roles["Manager"];
    let export = fx.ids.permissions["report.export"];

    // 先填充缓存
    let before = fx.services.resolver.resolve_effective_permissions(jane).await?;
    assert!(before.all_permissions.contains(&"report.export".to_string()));

    let outcome = fx
        .services
        .assignments
        .remove_permission_from_role(manager, export)
        .await?;
    assert_eq!(outcome, RemoveOutcome::Removed);
    assert!(!fx.cache.contains_key(&format!("user:permissions:{}", jane)));

    let after = fx.services.resolver.resolve_effective_permissions(jane).await?;
    assert!(!after.all_permissions.contains(&"report.export".to_string()));
    assert!(after.all_permissions.contains(&"report.view".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_group_membership_change_refreshes_user() -> Result<()> {
    let fx = seeded().await?;
    let alice = fx.ids.users["alice.johnson"];
    let management = fx.ids.groups["Management"];

    let before = fx.services.resolver.resolve_effective_permissions(alice).await?;
    assert!(!before.all_permissions.contains(&"user.write".to_string()));

    fx.services
        .assignments
        .assign_user_to_group(alice, management)
        .await?;
    let after = fx.services.resolver.resolve_effective_permissions(alice).await?;
    assert!(after.group_inherited_permissions.contains(&"user.write".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_deleting_role_cascades_to_edges() -> Result<()> {
    let fx = seeded().await?;
    let jane = fx.ids.users["jane.smith"];
    let manager = fx.ids.roles["Manager"];

    fx.services.resolver.resolve_effective_permissions(jane).await?;
    let before = fx.store.snapshot().await?;
    fx.services.roles.delete(manager).await?;

    let after = fx.store.snapshot().await?;
    assert!(after.user_roles.iter().all(|e| e.key.right != manager));
    assert!(after.group_roles.iter().all(|e| e.key.right != manager));
    assert!(after.role_permissions.iter().all(|e| e.key.left != manager));
    assert_eq!(after.user_groups, before.user_groups);
    let survivors = |edges: &[rbac_admin::model::Edge], on_left: bool| {
        edges
            .iter()
            .filter(|e| (if on_left { e.key.left } else { e.key.right }) != manager)
            .cloned()
            .collect::<Vec<_>>()
    };
    assert_eq!(after.user_roles, survivors(&before.user_roles, false));
    assert_eq!(after.group_roles, survivors(&before.group_roles, false));
    assert_eq!(after.role_permissions, survivors(&before.role_permissions, true));

    // Manager 是 jane 的直接角色，也是 Management 组的角色
    let perms = fx.services.resolver.resolve_effective_permissions(jane).await?;
    assert!(perms.direct_permissions.is_empty());
    assert_eq!(
        perms.all_permissions,
        vec!["group.read", "report.view", "user.read"]
    );

    let removed = fx
        .services
        .assignments
        .remove_role_from_user(jane, manager)
        .await?;
    assert_eq!(removed, RemoveOutcome::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_bulk_assignment_counts_only_new_edges() -> Result<()> {
    let fx = seeded().await?;
    let bob = fx.ids.users["bob.wilson"];
    let user_role = fx.ids.roles["User"];
    let viewer = fx.ids.roles["Viewer"];
    let admin = fx.ids.roles["Admin"];

    let inserted = fx
        .services
        .assignments
        .bulk_assign_roles_to_user(bob, &[user_role, viewer, admin, viewer])
        .await?;
    assert_eq!(inserted, 2);

    let again = fx
        .services
        .assignments
        .bulk_assign_roles_to_user(bob, &[user_role, viewer, admin])
        .await?;
    assert_eq!(again, 0);
    Ok(())
}

#[tokio::test]
async fn test_bulk_assignment_with_unknown_id_writes_nothing() -> Result<()> {
    let fx = seeded().await?;
    let bob = fx.ids.users["bob.wilson"];
    let viewer = fx.ids.roles["Viewer"];

    let result = fx
        .services
        .assignments
        .bulk_assign_roles_to_user(bob, &[viewer, 9_999])
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));

    let perms = fx.services.resolver.resolve_effective_permissions(bob).await?;
    assert!(!perms.all_permissions.contains(&"role.read".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_broken_cache_fails_open() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    DataSeeder::new(store.clone()).seed_if_empty().await?;
    let ids = Ids::load(store.as_ref()).await?;
    let services = RbacServices::new(store, Arc::new(BrokenCache), CacheSettings::default());

    let jane = ids.users["jane.smith"];
    let perms = services.resolver.resolve_effective_permissions(jane).await?;
    assert_eq!(perms.all_permissions.len(), 5);

    // 失效失败不影响写操作
    let outcome = services
        .assignments
        .remove_role_from_user(jane, ids.roles["Manager"])
        .await?;
    assert_eq!(outcome, RemoveOutcome::Removed);
    Ok(())
}

#[tokio::test]
async fn test_store_outage_surfaces_as_store_error() -> Result<()> {
    let fx = seeded().await?;
    let jane = fx.ids.users["jane.smith"];
    fx.store.set_offline(true);

    let err = fx
        .services
        .resolver
        .resolve_effective_permissions(jane)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
    Ok(())
}

#[tokio::test]
async fn test_seeding_is_skipped_when_populated() -> Result<()> {
    let fx = seeded().await?;
    let second = DataSeeder::new(fx.store.clone()).seed_if_empty().await?;
    assert!(second.is_none());
    Ok(())
}

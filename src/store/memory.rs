//! 进程内存储 / In-process store
//!
//! 单进程部署与测试使用；唯一性、端点存在性与级联删除在这里手动维护
//! Used for single-process deployments and tests; uniqueness, endpoint liveness and
//! cascade deletes are enforced here by hand

use super::{EntityCounts, RbacSnapshot, RbacStore, StoreError, StoreResult};
use crate::model::{
    CreateGroupRequest, CreatePermissionRequest, CreateRoleRequest, CreateUserRequest, Edge,
    EdgeKey, EdgeKind, EntityKind, Group, GroupFilter, GroupGrant, Page, Permission,
    PermissionFilter, Role, RoleFilter, RoleGrant, UpdateGroupRequest, UpdatePermissionRequest,
    UpdateRoleRequest, UpdateUserRequest, User, UserAccessGraph, UserFilter,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    roles: BTreeMap<i64, Role>,
    permissions: BTreeMap<i64, Permission>,
    sequences: HashMap<EntityKind, i64>,
    edges: HashMap<EdgeKind, BTreeMap<EdgeKey, Option<DateTime<Utc>>>>,
}

impl State {
    fn next_id(&mut self, kind: EntityKind) -> i64 {
        let seq = self.sequences.entry(kind).or_insert(0);
        *seq += 1;
        *seq
    }

    fn contains(&self, kind: EntityKind, id: i64) -> bool {
        match kind {
            EntityKind::User => self.users.contains_key(&id),
            EntityKind::Group => self.groups.contains_key(&id),
            EntityKind::Role => self.roles.contains_key(&id),
            EntityKind::Permission => self.permissions.contains_key(&id),
        }
    }

    fn edges(&self, kind: EdgeKind) -> impl Iterator<Item = (&EdgeKey, &Option<DateTime<Utc>>)> {
        self.edges.get(&kind).into_iter().flat_map(|m| m.iter())
    }

    /// 以 left 为键查找右侧 id，按 id 升序
    /// Right-hand ids for one left-hand key, ascending
    fn rights_of(&self, kind: EdgeKind, left: i64) -> Vec<i64> {
        self.edges(kind)
            .filter(|(k, _)| k.left == left)
            .map(|(k, _)| k.right)
            .collect()
    }

    fn ensure_endpoints(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<()> {
        for (entity, id) in [(kind.left_entity(), key.left), (kind.right_entity(), key.right)] {
            if !self.contains(entity, id) {
                return Err(StoreError::NotFound(format!("{} with ID {} not found", entity, id)));
            }
        }
        Ok(())
    }

    fn insert_edge(&mut self, kind: EdgeKind, key: EdgeKey) -> bool {
        let assigned_at = kind.has_assigned_at().then(Utc::now);
        let table = self.edges.entry(kind).or_default();
        if table.contains_key(&key) {
            return false;
        }
        table.insert(key, assigned_at);
        true
    }

    /// 删除引用某个实体的所有边 / drop every edge referencing the entity
    fn cascade(&mut self, entity: EntityKind, id: i64) -> usize {
        let mut removed = 0;
        for (kind, table) in self.edges.iter_mut() {
            if !kind.touches(entity) {
                continue;
            }
            let left = kind.left_entity() == entity;
            let right = kind.right_entity() == entity;
            let before = table.len();
            table.retain(|k, _| !((left && k.left == id) || (right && k.right == id)));
            removed += before - table.len();
        }
        removed
    }

    fn permission_names(&self, role_id: i64) -> Vec<String> {
        self.rights_of(EdgeKind::RolePermission, role_id)
            .into_iter()
            .filter_map(|pid| self.permissions.get(&pid))
            .map(|p| p.permission_name.clone())
            .collect()
    }

    fn role_grants(&self, role_ids: Vec<i64>) -> Vec<RoleGrant> {
        role_ids
            .into_iter()
            .map(|role_id| RoleGrant {
                role_id,
                permissions: self.permission_names(role_id),
            })
            .collect()
    }

    fn snapshot_edges(&self, kind: EdgeKind) -> Vec<Edge> {
        self.edges(kind)
            .map(|(key, assigned_at)| Edge {
                key: *key,
                assigned_at: *assigned_at,
            })
            .collect()
    }
}

fn contains_opt(value: &str, needle: &Option<String>) -> bool {
    needle.as_deref().map_or(true, |n| value.contains(n))
}

/// 内存存储 / In-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟后端不可用，之后的每次调用都返回 `Unavailable`
    /// Simulate an outage: every following call returns `Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(anyhow!("memory store is offline")));
        }
        Ok(())
    }

    async fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.check_online()?;
        Ok(self.state.read().await)
    }

    async fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.check_online()?;
        Ok(self.state.write().await)
    }
}

#[async_trait]
impl RbacStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Page<User>> {
        let state = self.read().await?;
        let all = state
            .users
            .values()
            .filter(|u| contains_opt(&u.username, &filter.username))
            .filter(|u| contains_opt(&u.email, &filter.email))
            .filter(|u| filter.is_active.map_or(true, |a| u.is_active == a))
            .cloned()
            .collect();
        Ok(Page::from_ordered(all, filter.page()))
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.read().await?.users.get(&user_id).cloned())
    }

    async fn create_user(&self, req: &CreateUserRequest) -> StoreResult<User> {
        let mut state = self.write().await?;
        if state.users.values().any(|u| u.username == req.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                req.username
            )));
        }
        if state.users.values().any(|u| u.email == req.email) {
            return Err(StoreError::Conflict(format!("email '{}' already exists", req.email)));
        }
        let user = User {
            user_id: state.next_id(EntityKind::User),
            username: req.username.clone(),
            email: req.email.clone(),
            is_active: req.is_active,
            created_at: Utc::now(),
        };
        state.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user_id: i64, req: &UpdateUserRequest) -> StoreResult<Option<User>> {
        let mut state = self.write().await?;
        if !state.users.contains_key(&user_id) {
            return Ok(None);
        }
        let clash = state.users.values().any(|u| {
            u.user_id != user_id
                && (req.username.as_deref() == Some(u.username.as_str())
                    || req.email.as_deref() == Some(u.email.as_str()))
        });
        if clash {
            return Err(StoreError::Conflict("username or email already exists".into()));
        }
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(username) = &req.username {
            user.username = username.clone();
        }
        if let Some(email) = &req.email {
            user.email = email.clone();
        }
        if let Some(active) = req.is_active {
            user.is_active = active;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        let mut state = self.write().await?;
        if state.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        state.cascade(EntityKind::User, user_id);
        Ok(true)
    }

    async fn list_groups(&self, filter: &GroupFilter) -> StoreResult<Page<Group>> {
        let state = self.read().await?;
        let all = state
            .groups
            .values()
            .filter(|g| contains_opt(&g.group_name, &filter.group_name))
            .cloned()
            .collect();
        Ok(Page::from_ordered(all, filter.page()))
    }

    async fn get_group(&self, group_id: i64) -> StoreResult<Option<Group>> {
        Ok(self.read().await?.groups.get(&group_id).cloned())
    }

    async fn create_group(&self, req: &CreateGroupRequest) -> StoreResult<Group> {
        let mut state = self.write().await?;
        if state.groups.values().any(|g| g.group_name == req.group_name) {
            return Err(StoreError::Conflict(format!(
                "group '{}' already exists",
                req.group_name
            )));
        }
        let group = Group {
            group_id: state.next_id(EntityKind::Group),
            group_name: req.group_name.clone(),
            description: req.description.clone(),
            created_at: Utc::now(),
        };
        state.groups.insert(group.group_id, group.clone());
        Ok(group)
    }

    async fn update_group(
        &self,
        group_id: i64,
        req: &UpdateGroupRequest,
    ) -> StoreResult<Option<Group>> {
        let mut state = self.write().await?;
        if let Some(name) = &req.group_name {
            if state
                .groups
                .values()
                .any(|g| g.group_id != group_id && &g.group_name == name)
            {
                return Err(StoreError::Conflict(format!("group '{}' already exists", name)));
            }
        }
        let Some(group) = state.groups.get_mut(&group_id) else {
            return Ok(None);
        };
        if let Some(name) = &req.group_name {
            group.group_name = name.clone();
        }
        if let Some(description) = &req.description {
            group.description = Some(description.clone());
        }
        Ok(Some(group.clone()))
    }

    async fn delete_group(&self, group_id: i64) -> StoreResult<bool> {
        let mut state = self.write().await?;
        if state.groups.remove(&group_id).is_none() {
            return Ok(false);
        }
        state.cascade(EntityKind::Group, group_id);
        Ok(true)
    }

    async fn list_roles(&self, filter: &RoleFilter) -> StoreResult<Page<Role>> {
        let state = self.read().await?;
        let all = state
            .roles
            .values()
            .filter(|r| contains_opt(&r.role_name, &filter.role_name))
            .cloned()
            .collect();
        Ok(Page::from_ordered(all, filter.page()))
    }

    async fn get_role(&self, role_id: i64) -> StoreResult<Option<Role>> {
        Ok(self.read().await?.roles.get(&role_id).cloned())
    }

    async fn create_role(&self, req: &CreateRoleRequest) -> StoreResult<Role> {
        let mut state = self.write().await?;
        if state.roles.values().any(|r| r.role_name == req.role_name) {
            return Err(StoreError::Conflict(format!(
                "role '{}' already exists",
                req.role_name
            )));
        }
        let role = Role {
            role_id: state.next_id(EntityKind::Role),
            role_name: req.role_name.clone(),
            description: req.description.clone(),
            created_at: Utc::now(),
        };
        state.roles.insert(role.role_id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, role_id: i64, req: &UpdateRoleRequest) -> StoreResult<Option<Role>> {
        let mut state = self.write().await?;
        if let Some(name) = &req.role_name {
            if state
                .roles
                .values()
                .any(|r| r.role_id != role_id && &r.role_name == name)
            {
                return Err(StoreError::Conflict(format!("role '{}' already exists", name)));
            }
        }
        let Some(role) = state.roles.get_mut(&role_id) else {
            return Ok(None);
        };
        if let Some(name) = &req.role_name {
            role.role_name = name.clone();
        }
        if let Some(description) = &req.description {
            role.description = Some(description.clone());
        }
        Ok(Some(role.clone()))
    }

    async fn delete_role(&self, role_id: i64) -> StoreResult<bool> {
        let mut state = self.write().await?;
        if state.roles.remove(&role_id).is_none() {
            return Ok(false);
        }
        state.cascade(EntityKind::Role, role_id);
        Ok(true)
    }

    async fn role_permissions(&self, role_id: i64) -> StoreResult<Vec<Permission>> {
        let state = self.read().await?;
        Ok(state
            .rights_of(EdgeKind::RolePermission, role_id)
            .into_iter()
            .filter_map(|pid| state.permissions.get(&pid).cloned())
            .collect())
    }

    async fn list_permissions(&self, filter: &PermissionFilter) -> StoreResult<Page<Permission>> {
        let state = self.read().await?;
        let all = state
            .permissions
            .values()
            .filter(|p| contains_opt(&p.permission_name, &filter.permission_name))
            .cloned()
            .collect();
        Ok(Page::from_ordered(all, filter.page()))
    }

    async fn get_permission(&self, permission_id: i64) -> StoreResult<Option<Permission>> {
        Ok(self.read().await?.permissions.get(&permission_id).cloned())
    }

    async fn create_permission(&self, req: &CreatePermissionRequest) -> StoreResult<Permission> {
        let mut state = self.write().await?;
        if state
            .permissions
            .values()
            .any(|p| p.permission_name == req.permission_name)
        {
            return Err(StoreError::Conflict(format!(
                "permission '{}' already exists",
                req.permission_name
            )));
        }
        let permission = Permission {
            permission_id: state.next_id(EntityKind::Permission),
            permission_name: req.permission_name.clone(),
            description: req.description.clone(),
        };
        state
            .permissions
            .insert(permission.permission_id, permission.clone());
        Ok(permission)
    }

    async fn update_permission(
        &self,
        permission_id: i64,
        req: &UpdatePermissionRequest,
    ) -> StoreResult<Option<Permission>> {
        let mut state = self.write().await?;
        if let Some(name) = &req.permission_name {
            if state
                .permissions
                .values()
                .any(|p| p.permission_id != permission_id && &p.permission_name == name)
            {
                return Err(StoreError::Conflict(format!(
                    "permission '{}' already exists",
                    name
                )));
            }
        }
        let Some(permission) = state.permissions.get_mut(&permission_id) else {
            return Ok(None);
        };
        if let Some(name) = &req.permission_name {
            permission.permission_name = name.clone();
        }
        if let Some(description) = &req.description {
            permission.description = Some(description.clone());
        }
        Ok(Some(permission.clone()))
    }

    async fn delete_permission(&self, permission_id: i64) -> StoreResult<bool> {
        let mut state = self.write().await?;
        if state.permissions.remove(&permission_id).is_none() {
            return Ok(false);
        }
        state.cascade(EntityKind::Permission, permission_id);
        Ok(true)
    }

    async fn edge_exists(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<bool> {
        let state = self.read().await?;
        Ok(state.edges.get(&kind).is_some_and(|t| t.contains_key(&key)))
    }

    async fn insert_edge(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<()> {
        let mut state = self.write().await?;
        state.ensure_endpoints(kind, key)?;
        if !state.insert_edge(kind, key) {
            return Err(StoreError::Conflict(format!("{} assignment already exists", kind)));
        }
        Ok(())
    }

    async fn delete_edge(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<bool> {
        let mut state = self.write().await?;
        Ok(state
            .edges
            .get_mut(&kind)
            .is_some_and(|t| t.remove(&key).is_some()))
    }

    async fn existing_edges(&self, kind: EdgeKind, keys: &[EdgeKey]) -> StoreResult<Vec<EdgeKey>> {
        let state = self.read().await?;
        let Some(table) = state.edges.get(&kind) else {
            return Ok(Vec::new());
        };
        Ok(keys.iter().filter(|k| table.contains_key(k)).copied().collect())
    }

    async fn insert_edges(&self, kind: EdgeKind, keys: &[EdgeKey]) -> StoreResult<u64> {
        let mut state = self.write().await?;
        // 先整体校验，任何端点缺失都不写入
        for key in keys {
            state.ensure_endpoints(kind, *key)?;
        }
        let mut inserted = 0;
        for key in keys {
            if state.insert_edge(kind, *key) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn user_access_graph(&self, user_id: i64) -> StoreResult<Option<UserAccessGraph>> {
        let state = self.read().await?;
        let Some(user) = state.users.get(&user_id).cloned() else {
            return Ok(None);
        };
        let direct_roles = state.role_grants(state.rights_of(EdgeKind::UserRole, user_id));
        let groups = state
            .rights_of(EdgeKind::UserGroup, user_id)
            .into_iter()
            .map(|group_id| GroupGrant {
                group_id,
                roles: state.role_grants(state.rights_of(EdgeKind::GroupRole, group_id)),
            })
            .collect();
        Ok(Some(UserAccessGraph {
            user,
            direct_roles,
            groups,
        }))
    }

    async fn snapshot(&self) -> StoreResult<RbacSnapshot> {
        let state = self.read().await?;
        Ok(RbacSnapshot {
            users: state.users.values().cloned().collect(),
            groups: state.groups.values().cloned().collect(),
            roles: state.roles.values().cloned().collect(),
            permissions: state.permissions.values().cloned().collect(),
            user_groups: state.snapshot_edges(EdgeKind::UserGroup),
            user_roles: state.snapshot_edges(EdgeKind::UserRole),
            group_roles: state.snapshot_edges(EdgeKind::GroupRole),
            role_permissions: state.snapshot_edges(EdgeKind::RolePermission),
        })
    }

    async fn counts(&self) -> StoreResult<EntityCounts> {
        let state = self.read().await?;
        Ok(EntityCounts {
            users: state.users.len() as u64,
            groups: state.groups.len() as u64,
            roles: state.roles.len() as u64,
            permissions: state.permissions.len() as u64,
        })
    }
}

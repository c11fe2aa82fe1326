//! PostgreSQL 存储实现 / PostgreSQL store implementation
//!
//! 唯一约束冲突（23505）映射为 `Conflict`，外键冲突（23503）映射为 `NotFound`
//! Unique violations (23505) map to `Conflict`, foreign-key violations (23503) to `NotFound`

use super::{
    fold_group_rows, fold_role_rows, EntityCounts, RbacSnapshot, RbacStore, StoreError, StoreResult,
};
use crate::model::{
    CreateGroupRequest, CreatePermissionRequest, CreateRoleRequest, CreateUserRequest, Edge,
    EdgeKey, EdgeKind, Group, GroupFilter, Page, PageRequest, Permission, PermissionFilter, Role,
    RoleFilter, UpdateGroupRequest, UpdatePermissionRequest, UpdateRoleRequest, UpdateUserRequest,
    User, UserAccessGraph, UserFilter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

const USER_COLUMNS: &str = "user_id, username, email, is_active, created_at";
const GROUP_COLUMNS: &str = "group_id, group_name, description, created_at";
const ROLE_COLUMNS: &str = "role_id, role_name, description, created_at";
const PERMISSION_COLUMNS: &str = "permission_id, permission_name, description";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
            other => StoreError::Unavailable(other.into()),
        }
    }
}

fn db_code(err: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|c| c.into_owned());
    }
    None
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    db_code(err).as_deref() == Some("23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    db_code(err).as_deref() == Some("23503")
}

/// 写操作错误分类 / Classify write errors
fn classify(err: sqlx::Error, what: impl Into<String>) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::Conflict(format!("{} already exists", what.into()));
    }
    if is_foreign_key_violation(&err) {
        return StoreError::NotFound(format!("{} references a missing entity", what.into()));
    }
    StoreError::from(err)
}

/// PostgreSQL 存储 / PostgreSQL store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行内嵌迁移 / Run embedded migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.into()))
    }

    async fn fetch_page<T>(
        &self,
        mut count: QueryBuilder<'_, Postgres>,
        mut items: QueryBuilder<'_, Postgres>,
        order_by: &str,
        page: PageRequest,
    ) -> StoreResult<Page<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        items
            .push(format!(" ORDER BY {} LIMIT ", order_by))
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = items.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok(Page::new(rows, total.max(0) as u64, page))
    }

    async fn list_by_name<T>(
        &self,
        table: &str,
        columns: &str,
        name_column: &str,
        id_column: &str,
        name: &Option<String>,
        page: PageRequest,
    ) -> StoreResult<Page<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE TRUE", table));
        let mut items: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM {} WHERE TRUE", columns, table));
        if let Some(name) = name {
            for qb in [&mut count, &mut items] {
                qb.push(format!(" AND strpos({}, ", name_column))
                    .push_bind(name.clone())
                    .push(") > 0");
            }
        }
        self.fetch_page(count, items, id_column, page).await
    }

    async fn delete_by_id(&self, table: &str, id_column: &str, id: i64) -> StoreResult<bool> {
        // 边表上的外键为 ON DELETE CASCADE
        let res = sqlx::query(&format!("DELETE FROM {} WHERE {} = $1", table, id_column))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

const READ_SNAPSHOT: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

/// 开启只读快照事务，事务内的多条查询看到同一时刻的数据
/// Begin a read-only snapshot transaction shared by several queries
async fn begin_read_snapshot(pool: &PgPool) -> StoreResult<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;
    sqlx::query(READ_SNAPSHOT).execute(&mut *tx).await?;
    Ok(tx)
}

fn edges_sql(kind: EdgeKind) -> String {
    let assigned = if kind.has_assigned_at() {
        "assigned_at"
    } else {
        "NULL::timestamptz"
    };
    format!(
        "SELECT {l}, {r}, {a} FROM {t} ORDER BY {l}, {r}",
        l = kind.left_column(),
        r = kind.right_column(),
        a = assigned,
        t = kind.table()
    )
}

/// 读取某类边的全部记录，在调用方的连接或事务上执行
/// Read every edge of one kind on the caller's connection or transaction
async fn edges_of(conn: &mut PgConnection, kind: EdgeKind) -> StoreResult<Vec<Edge>> {
    let rows: Vec<(i64, i64, Option<DateTime<Utc>>)> =
        sqlx::query_as(&edges_sql(kind)).fetch_all(&mut *conn).await?;
    Ok(rows
        .into_iter()
        .map(|(left, right, assigned_at)| Edge {
            key: EdgeKey::new(left, right),
            assigned_at,
        })
        .collect())
}

fn split_keys(keys: &[EdgeKey]) -> (Vec<i64>, Vec<i64>) {
    keys.iter().map(|k| (k.left, k.right)).unzip()
}

#[async_trait]
impl RbacStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::db::check_health(&self.pool).await
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Page<User>> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        let mut items: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));
        for qb in [&mut count, &mut items] {
            if let Some(username) = &filter.username {
                qb.push(" AND strpos(username, ")
                    .push_bind(username.clone())
                    .push(") > 0");
            }
            if let Some(email) = &filter.email {
                qb.push(" AND strpos(email, ")
                    .push_bind(email.clone())
                    .push(") > 0");
            }
            if let Some(active) = filter.is_active {
                qb.push(" AND is_active = ").push_bind(active);
            }
        }
        self.fetch_page(count, items, "user_id", filter.page()).await
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, req: &CreateUserRequest) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, is_active) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&req.username)
            .bind(&req.email)
            .bind(req.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "username or email"))
    }

    async fn update_user(&self, user_id: i64, req: &UpdateUserRequest) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email), \
             is_active = COALESCE($4, is_active) WHERE user_id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(&req.username)
            .bind(&req.email)
            .bind(req.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "username or email"))
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        self.delete_by_id("users", "user_id", user_id).await
    }

    async fn list_groups(&self, filter: &GroupFilter) -> StoreResult<Page<Group>> {
        self.list_by_name(
            "groups",
            GROUP_COLUMNS,
            "group_name",
            "group_id",
            &filter.group_name,
            filter.page(),
        )
        .await
    }

    async fn get_group(&self, group_id: i64) -> StoreResult<Option<Group>> {
        let sql = format!("SELECT {} FROM groups WHERE group_id = $1", GROUP_COLUMNS);
        Ok(sqlx::query_as::<_, Group>(&sql)
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_group(&self, req: &CreateGroupRequest) -> StoreResult<Group> {
        let sql = format!(
            "INSERT INTO groups (group_name, description) VALUES ($1, $2) RETURNING {}",
            GROUP_COLUMNS
        );
        sqlx::query_as::<_, Group>(&sql)
            .bind(&req.group_name)
            .bind(&req.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, format!("group '{}'", req.group_name)))
    }

    async fn update_group(
        &self,
        group_id: i64,
        req: &UpdateGroupRequest,
    ) -> StoreResult<Option<Group>> {
        let sql = format!(
            "UPDATE groups SET group_name = COALESCE($2, group_name), \
             description = COALESCE($3, description) WHERE group_id = $1 RETURNING {}",
            GROUP_COLUMNS
        );
        sqlx::query_as::<_, Group>(&sql)
            .bind(group_id)
            .bind(&req.group_name)
            .bind(&req.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "group name"))
    }

    async fn delete_group(&self, group_id: i64) -> StoreResult<bool> {
        self.delete_by_id("groups", "group_id", group_id).await
    }

    async fn list_roles(&self, filter: &RoleFilter) -> StoreResult<Page<Role>> {
        self.list_by_name(
            "roles",
            ROLE_COLUMNS,
            "role_name",
            "role_id",
            &filter.role_name,
            filter.page(),
        )
        .await
    }

    async fn get_role(&self, role_id: i64) -> StoreResult<Option<Role>> {
        let sql = format!("SELECT {} FROM roles WHERE role_id = $1", ROLE_COLUMNS);
        Ok(sqlx::query_as::<_, Role>(&sql)
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_role(&self, req: &CreateRoleRequest) -> StoreResult<Role> {
        let sql = format!(
            "INSERT INTO roles (role_name, description) VALUES ($1, $2) RETURNING {}",
            ROLE_COLUMNS
        );
        sqlx::query_as::<_, Role>(&sql)
            .bind(&req.role_name)
            .bind(&req.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, format!("role '{}'", req.role_name)))
    }

    async fn update_role(&self, role_id: i64, req: &UpdateRoleRequest) -> StoreResult<Option<Role>> {
        let sql = format!(
            "UPDATE roles SET role_name = COALESCE($2, role_name), \
             description = COALESCE($3, description) WHERE role_id = $1 RETURNING {}",
            ROLE_COLUMNS
        );
        sqlx::query_as::<_, Role>(&sql)
            .bind(role_id)
            .bind(&req.role_name)
            .bind(&req.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "role name"))
    }

    async fn delete_role(&self, role_id: i64) -> StoreResult<bool> {
        self.delete_by_id("roles", "role_id", role_id).await
    }

    async fn role_permissions(&self, role_id: i64) -> StoreResult<Vec<Permission>> {
        Ok(sqlx::query_as::<_, Permission>(
            "SELECT p.permission_id, p.permission_name, p.description \
             FROM role_permissions rp JOIN permissions p ON p.permission_id = rp.permission_id \
             WHERE rp.role_id = $1 ORDER BY p.permission_id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_permissions(&self, filter: &PermissionFilter) -> StoreResult<Page<Permission>> {
        self.list_by_name(
            "permissions",
            PERMISSION_COLUMNS,
            "permission_name",
            "permission_id",
            &filter.permission_name,
            filter.page(),
        )
        .await
    }

    async fn get_permission(&self, permission_id: i64) -> StoreResult<Option<Permission>> {
        let sql = format!(
            "SELECT {} FROM permissions WHERE permission_id = $1",
            PERMISSION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Permission>(&sql)
            .bind(permission_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_permission(&self, req: &CreatePermissionRequest) -> StoreResult<Permission> {
        let sql = format!(
            "INSERT INTO permissions (permission_name, description) VALUES ($1, $2) RETURNING {}",
            PERMISSION_COLUMNS
        );
        sqlx::query_as::<_, Permission>(&sql)
            .bind(&req.permission_name)
            .bind(&req.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, format!("permission '{}'", req.permission_name)))
    }

    async fn update_permission(
        &self,
        permission_id: i64,
        req: &UpdatePermissionRequest,
    ) -> StoreResult<Option<Permission>> {
        let sql = format!(
            "UPDATE permissions SET permission_name = COALESCE($2, permission_name), \
             description = COALESCE($3, description) WHERE permission_id = $1 RETURNING {}",
            PERMISSION_COLUMNS
        );
        sqlx::query_as::<_, Permission>(&sql)
            .bind(permission_id)
            .bind(&req.permission_name)
            .bind(&req.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "permission name"))
    }

    async fn delete_permission(&self, permission_id: i64) -> StoreResult<bool> {
        self.delete_by_id("permissions", "permission_id", permission_id)
            .await
    }

    async fn edge_exists(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1 AND {} = $2)",
            kind.table(),
            kind.left_column(),
            kind.right_column()
        );
        Ok(sqlx::query_scalar::<_, bool>(&sql)
            .bind(key.left)
            .bind(key.right)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert_edge(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<()> {
        let sql = if kind.has_assigned_at() {
            format!(
                "INSERT INTO {} ({}, {}, assigned_at) VALUES ($1, $2, NOW())",
                kind.table(),
                kind.left_column(),
                kind.right_column()
            )
        } else {
            format!(
                "INSERT INTO {} ({}, {}) VALUES ($1, $2)",
                kind.table(),
                kind.left_column(),
                kind.right_column()
            )
        };
        sqlx::query(&sql)
            .bind(key.left)
            .bind(key.right)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, format!("{} assignment", kind)))?;
        Ok(())
    }

    async fn delete_edge(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            kind.table(),
            kind.left_column(),
            kind.right_column()
        );
        let res = sqlx::query(&sql)
            .bind(key.left)
            .bind(key.right)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn existing_edges(&self, kind: EdgeKind, keys: &[EdgeKey]) -> StoreResult<Vec<EdgeKey>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let (lefts, rights) = split_keys(keys);
        let sql = format!(
            "SELECT e.{l}, e.{r} FROM {t} e \
             JOIN UNNEST($1::bigint[], $2::bigint[]) AS c(l, r) ON e.{l} = c.l AND e.{r} = c.r",
            l = kind.left_column(),
            r = kind.right_column(),
            t = kind.table()
        );
        let rows: Vec<(i64, i64)> = sqlx::query_as(&sql)
            .bind(lefts)
            .bind(rights)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(l, r)| EdgeKey::new(l, r)).collect())
    }

    async fn insert_edges(&self, kind: EdgeKind, keys: &[EdgeKey]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let (lefts, rights) = split_keys(keys);
        let (columns, values) = if kind.has_assigned_at() {
            (
                format!("{}, {}, assigned_at", kind.left_column(), kind.right_column()),
                "c.l, c.r, NOW()",
            )
        } else {
            (
                format!("{}, {}", kind.left_column(), kind.right_column()),
                "c.l, c.r",
            )
        };
        // 单条语句即为原子批次；并发插入的重复行由 ON CONFLICT 吸收
        let sql = format!(
            "INSERT INTO {t} ({columns}) SELECT {values} \
             FROM UNNEST($1::bigint[], $2::bigint[]) AS c(l, r) ON CONFLICT DO NOTHING",
            t = kind.table(),
            columns = columns,
            values = values
        );
        let res = sqlx::query(&sql)
            .bind(lefts)
            .bind(rights)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, format!("{} assignment", kind)))?;
        debug!(kind = %kind, inserted = res.rows_affected(), "批量插入完成 / batch insert done");
        Ok(res.rows_affected())
    }

    async fn user_access_graph(&self, user_id: i64) -> StoreResult<Option<UserAccessGraph>> {
        let mut tx = begin_read_snapshot(&self.pool).await?;

        let sql = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);
        let Some(user) = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let direct: Vec<(i64, Option<String>)> = sqlx::query_as(
            "SELECT ur.role_id, p.permission_name FROM user_roles ur \
             LEFT JOIN role_permissions rp ON rp.role_id = ur.role_id \
             LEFT JOIN permissions p ON p.permission_id = rp.permission_id \
             WHERE ur.user_id = $1 ORDER BY ur.role_id, p.permission_id",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let inherited: Vec<(i64, Option<i64>, Option<String>)> = sqlx::query_as(
            "SELECT ug.group_id, gr.role_id, p.permission_name FROM user_groups ug \
             LEFT JOIN group_roles gr ON gr.group_id = ug.group_id \
             LEFT JOIN role_permissions rp ON rp.role_id = gr.role_id \
             LEFT JOIN permissions p ON p.permission_id = rp.permission_id \
             WHERE ug.user_id = $1 ORDER BY ug.group_id, gr.role_id, p.permission_id",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(UserAccessGraph {
            user,
            direct_roles: fold_role_rows(direct),
            groups: fold_group_rows(inherited),
        }))
    }

    async fn snapshot(&self) -> StoreResult<RbacSnapshot> {
        // 同一快照内读取，边不会引用列表中缺失的实体
        let mut tx = begin_read_snapshot(&self.pool).await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY user_id",
            USER_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;
        let groups = sqlx::query_as::<_, Group>(&format!(
            "SELECT {} FROM groups ORDER BY group_id",
            GROUP_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {} FROM roles ORDER BY role_id",
            ROLE_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;
        let permissions = sqlx::query_as::<_, Permission>(&format!(
            "SELECT {} FROM permissions ORDER BY permission_id",
            PERMISSION_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;
        let user_groups = edges_of(&mut tx, EdgeKind::UserGroup).await?;
        let user_roles = edges_of(&mut tx, EdgeKind::UserRole).await?;
        let group_roles = edges_of(&mut tx, EdgeKind::GroupRole).await?;
        let role_permissions = edges_of(&mut tx, EdgeKind::RolePermission).await?;
        tx.commit().await?;

        Ok(RbacSnapshot {
            users,
            groups,
            roles,
            permissions,
            user_groups,
            user_roles,
            group_roles,
            role_permissions,
        })
    }

    async fn counts(&self) -> StoreResult<EntityCounts> {
        let (users, groups, roles, permissions): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM users), (SELECT COUNT(*) FROM groups), \
             (SELECT COUNT(*) FROM roles), (SELECT COUNT(*) FROM permissions)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(EntityCounts {
            users: users as u64,
            groups: groups as u64,
            roles: roles as u64,
            permissions: permissions as u64,
        })
    }
}

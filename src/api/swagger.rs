use utoipa::OpenApi;

/// OpenAPI 文档聚合
#[derive(OpenApi)]
#[openapi(
    info(title = "RBAC Admin API", description = "用户、组、角色、权限及其分配关系的管理接口"),
    paths(
        crate::api::v1::users::list_users,
        crate::api::v1::users::get_user,
        crate::api::v1::users::create_user,
        crate::api::v1::users::update_user,
        crate::api::v1::users::delete_user,
        crate::api::v1::users::get_user_permissions,
        crate::api::v1::groups::list_groups,
        crate::api::v1::groups::get_group,
        crate::api::v1::groups::create_group,
        crate::api::v1::groups::update_group,
        crate::api::v1::groups::delete_group,
        crate::api::v1::roles::list_roles,
        crate::api::v1::roles::get_role,
        crate::api::v1::roles::create_role,
        crate::api::v1::roles::update_role,
        crate::api::v1::roles::delete_role,
        crate::api::v1::permissions::list_permissions,
        crate::api::v1::permissions::get_permission,
        crate::api::v1::permissions::create_permission,
        crate::api::v1::permissions::update_permission,
        crate::api::v1::permissions::delete_permission,
        crate::api::v1::assignments::assign_role_to_user,
        crate::api::v1::assignments::remove_role_from_user,
        crate::api::v1::assignments::assign_role_to_group,
        crate::api::v1::assignments::remove_role_from_group,
        crate::api::v1::assignments::assign_user_to_group,
        crate::api::v1::assignments::remove_user_from_group,
        crate::api::v1::assignments::assign_permission_to_role,
        crate::api::v1::assignments::remove_permission_from_role,
        crate::api::v1::assignments::bulk_assign_roles_to_user,
        crate::api::v1::assignments::bulk_assign_users_to_group,
        crate::api::v1::assignments::bulk_assign_permissions_to_role,
        crate::api::v1::export::export_json,
        crate::api::v1::export::export_info,
        crate::api::metrics::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            crate::model::User,
            crate::model::Group,
            crate::model::Role,
            crate::model::RoleDetail,
            crate::model::Permission,
            crate::model::EffectivePermissions,
            crate::model::PaginationMetadata,
            crate::model::CreateUserRequest,
            crate::model::UpdateUserRequest,
            crate::model::CreateGroupRequest,
            crate::model::UpdateGroupRequest,
            crate::model::CreateRoleRequest,
            crate::model::UpdateRoleRequest,
            crate::model::CreatePermissionRequest,
            crate::model::UpdatePermissionRequest,
            crate::model::AssignRoleToUserRequest,
            crate::model::AssignRoleToGroupRequest,
            crate::model::AssignUserToGroupRequest,
            crate::model::AssignPermissionToRoleRequest,
            crate::model::BulkAssignRolesToUserRequest,
            crate::model::BulkAssignUsersToGroupRequest,
            crate::model::BulkAssignPermissionsToRoleRequest,
            crate::service::export_service::ExportSnapshot,
            crate::service::export_service::ExportInfo,
            crate::store::EntityCounts,
            crate::middleware::metrics::RequestMetrics,
            crate::api::metrics::HealthResponse,
            crate::api::metrics::ComponentHealth,
        )
    ),
    tags(
        (name = "Users", description = "用户管理与有效权限查询"),
        (name = "Groups", description = "用户组管理"),
        (name = "Roles", description = "角色管理"),
        (name = "Permissions", description = "权限管理"),
        (name = "Assignments", description = "用户/组/角色/权限之间的分配关系"),
        (name = "Export", description = "数据导出"),
        (name = "Metrics", description = "健康检查与请求指标")
    )
)]
pub struct ApiDoc;

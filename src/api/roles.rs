//! Workspace role CRUD via `/api/roles` and member role assignment.
//!
//! These calls do not touch the permission cache; [`crate::TaskboardClient`]
//! invalidates it after each successful mutation.

use serde_json::Value;
use taskboard_common::{Relationship, Resource, ResourceIdentifier};

use crate::errors::ApiError;
use crate::http::{ApiClient, ApiRequest};
use crate::transform::{MemberRoleAssignment, WorkspaceRole, types};

const ROLES_PATH: &str = "api/roles";

fn role_path(id: &str) -> String {
    format!("{}/{}", ROLES_PATH, id)
}

/// Roles of one workspace, or every role the user can see.
pub async fn list_roles(
    api: &ApiClient,
    workspace_id: Option<&str>,
) -> Result<Vec<WorkspaceRole>, ApiError> {
    let mut req = ApiRequest::get(ROLES_PATH);
    if let Some(ws) = workspace_id {
        req = req.query_pair("workspace", ws);
    }
    api.send_json(&req).await
}

pub async fn get_role(api: &ApiClient, id: &str) -> Result<WorkspaceRole, ApiError> {
    api.get_json(&role_path(id)).await
}

pub async fn create_role(api: &ApiClient, role: &WorkspaceRole) -> Result<WorkspaceRole, ApiError> {
    let req = ApiRequest::post(ROLES_PATH).json(serde_json::to_value(role)?);
    let created: WorkspaceRole = api.send_json(&req).await?;
    tracing::info!(id = %created.id, name = %created.name, "role created");
    Ok(created)
}

/// Partial update; `changes` uses the same camelCase shape as a role.
pub async fn update_role(
    api: &ApiClient,
    id: &str,
    changes: Value,
) -> Result<WorkspaceRole, ApiError> {
    let req = ApiRequest::patch(role_path(id)).json(changes);
    api.send_json(&req).await
}

pub async fn delete_role(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.send_empty(&ApiRequest::delete(role_path(id))).await?;
    tracing::info!(id, "role deleted");
    Ok(())
}

/// Create a member role assignment.
pub async fn assign_role(
    api: &ApiClient,
    workspace_id: &str,
    user_id: &str,
    role_id: &str,
) -> Result<MemberRoleAssignment, ApiError> {
    let resource = assignment_resource(workspace_id, user_id, role_id);
    let created = api.create_resource(resource).await?;
    Ok(
        MemberRoleAssignment::from_resource(&created).unwrap_or(MemberRoleAssignment {
            id: created.id.clone(),
            workspace_id: workspace_id.to_string(),
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
        }),
    )
}

pub async fn remove_assignment(api: &ApiClient, assignment_id: &str) -> Result<(), ApiError> {
    api.delete_resource(types::MEMBER_ROLE, assignment_id).await
}

fn assignment_resource(workspace_id: &str, user_id: &str, role_id: &str) -> Resource {
    Resource::new(types::MEMBER_ROLE)
        .with_relationship(
            "workspace",
            Relationship::to_one(ResourceIdentifier::new(types::WORKSPACE, workspace_id)),
        )
        .with_relationship(
            "user",
            Relationship::to_one(ResourceIdentifier::new(types::USER, user_id)),
        )
        .with_relationship(
            "role",
            Relationship::to_one(ResourceIdentifier::new(types::WORKSPACE_ROLE, role_id)),
        )
}

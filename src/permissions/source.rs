use async_trait::async_trait;
use taskboard_common::Query;

use super::evaluator::PermissionSource;
use crate::errors::ApiError;
use crate::http::ApiClient;
use crate::transform::{MemberRoleAssignment, WorkspaceRole, types};

/// [`PermissionSource`] backed by the JSON:API endpoints.
#[derive(Debug, Clone)]
pub struct JsonApiPermissionSource {
    api: ApiClient,
}

impl JsonApiPermissionSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

fn not_found_as_none<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::Backend { status: 404, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl PermissionSource for JsonApiPermissionSource {
    async fn member_assignment(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<MemberRoleAssignment>, ApiError> {
        let query = Query::new()
            .filter("workspace.id", workspace_id)
            .filter("user.id", user_id)
            .page(1, 0);
        let doc = self.api.get_document(types::MEMBER_ROLE, &query).await?;
        Ok(doc
            .resources()
            .into_iter()
            .find_map(MemberRoleAssignment::from_resource))
    }

    async fn role(&self, role_id: &str) -> Result<Option<WorkspaceRole>, ApiError> {
        let doc = not_found_as_none(
            self.api
                .get_resource(types::WORKSPACE_ROLE, role_id, &Query::new())
                .await,
        )?;
        Ok(doc
            .as_ref()
            .and_then(|d| d.single())
            .map(WorkspaceRole::from_resource))
    }

    async fn default_role(&self, workspace_id: &str) -> Result<Option<WorkspaceRole>, ApiError> {
        let query = Query::new().include("default_role");
        let Some(doc) = not_found_as_none(
            self.api
                .get_resource(types::WORKSPACE, workspace_id, &query)
                .await,
        )?
        else {
            return Ok(None);
        };
        let Some(workspace) = doc.single() else {
            return Ok(None);
        };
        if let Some(role) = doc.resolve(workspace, "default_role").first() {
            return Ok(Some(WorkspaceRole::from_resource(role)));
        }
        match workspace.related_id("default_role") {
            Some(role_id) => self.role(role_id).await,
            None => Ok(None),
        }
    }
}

//! Workspace roles and member role assignments.

use serde::{Deserialize, Serialize};
use taskboard_common::{Document, Resource};

use super::types;
use crate::permissions::PermissionSet;

/// A named permission bundle scoped to a workspace.
///
/// Serializes in the `/api/roles` shape (camelCase, permissions as a flat
/// map); [`WorkspaceRole::from_resource`] reads the JSON:API shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRole {
    #[serde(default)]
    pub id: String,
    /// Machine name, e.g. `viewer`
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl WorkspaceRole {
    pub fn from_resource(resource: &Resource) -> Self {
        let label = resource
            .attr_str("label")
            .or_else(|| resource.attr_str("title"))
            .unwrap_or_default()
            .to_string();
        let name = resource
            .attr_str("machine_name")
            .or_else(|| resource.attr_str("name"))
            .map(str::to_string)
            .unwrap_or_else(|| label.to_lowercase().replace(' ', "_"));
        Self {
            id: resource.id.clone(),
            name,
            label,
            is_default: resource.attr_bool("is_default").unwrap_or(false),
            workspace_id: resource.related_id("workspace").map(str::to_string),
            permissions: PermissionSet::from_attributes(&resource.attributes),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// Roles of a document.
pub fn roles_from_document(doc: &Document) -> Vec<WorkspaceRole> {
    doc.resources()
        .into_iter()
        .filter(|r| r.kind == types::WORKSPACE_ROLE)
        .map(WorkspaceRole::from_resource)
        .collect()
}

/// Binding of one user to one role within one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRoleAssignment {
    #[serde(default)]
    pub id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub role_id: String,
}

impl MemberRoleAssignment {
    /// `None` when any of the three links is missing.
    pub fn from_resource(resource: &Resource) -> Option<Self> {
        Some(Self {
            id: resource.id.clone(),
            workspace_id: resource.related_id("workspace")?.to_string(),
            user_id: resource.related_id("user")?.to_string(),
            role_id: resource.related_id("role")?.to_string(),
        })
    }
}

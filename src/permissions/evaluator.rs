//! Effective permission resolution.
//!
//! ```text
//! super-admin uid / admin role name ──► everything `any`
//!        │ no
//!        ▼
//! member role assignment ──► its role
//!        │ none
//!        ▼
//! workspace default role
//!        │ none
//!        ▼
//! fallback (permissive, reports/admin denied)
//! ```
//!
//! Fetch failures never reach the caller. Cancellations are dropped
//! silently; anything else is logged and answered with the fallback.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use taskboard_common::PermissionLevel;
use tokio_util::sync::CancellationToken;

use super::catalog::{Action, Permission, Resource};
use super::set::PermissionSet;
use crate::config::PermissionsConfig;
use crate::errors::ApiError;
use crate::transform::{MemberRoleAssignment, WorkspaceRole};

/// The user whose permissions are being resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserContext {
    /// Backend resource id (UUID)
    pub id: String,
    /// Numeric account id, compared against the super-admin id
    pub uid: Option<u64>,
    /// Site-level role names
    pub roles: Vec<String>,
}

/// Where the permission data comes from.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn member_assignment(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<MemberRoleAssignment>, ApiError>;

    async fn role(&self, role_id: &str) -> Result<Option<WorkspaceRole>, ApiError>;

    async fn default_role(&self, workspace_id: &str) -> Result<Option<WorkspaceRole>, ApiError>;
}

/// How an effective set was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PermissionOrigin {
    SuperAdmin,
    AdminRole { role: String },
    Assignment { role_id: String, role_name: String },
    DefaultRole { role_id: String, role_name: String },
    Fallback,
    /// Resolution still in flight
    Loading,
}

impl std::fmt::Display for PermissionOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionOrigin::SuperAdmin => write!(f, "super admin"),
            PermissionOrigin::AdminRole { role } => write!(f, "admin role '{}'", role),
            PermissionOrigin::Assignment { role_name, .. } => {
                write!(f, "assigned role '{}'", role_name)
            }
            PermissionOrigin::DefaultRole { role_name, .. } => {
                write!(f, "workspace default role '{}'", role_name)
            }
            PermissionOrigin::Fallback => write!(f, "fallback"),
            PermissionOrigin::Loading => write!(f, "loading"),
        }
    }
}

/// The resolved set for one (workspace, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePermissions {
    pub origin: PermissionOrigin,
    pub set: PermissionSet,
}

impl EffectivePermissions {
    pub fn fallback() -> Self {
        Self {
            origin: PermissionOrigin::Fallback,
            set: PermissionSet::fallback(),
        }
    }

    /// Same posture as the fallback, reported as still loading.
    pub fn loading() -> Self {
        Self {
            origin: PermissionOrigin::Loading,
            set: PermissionSet::fallback(),
        }
    }

    fn everything(origin: PermissionOrigin) -> Self {
        Self {
            origin,
            set: PermissionSet::all(PermissionLevel::Any),
        }
    }

    pub fn is_bypass(&self) -> bool {
        matches!(
            self.origin,
            PermissionOrigin::SuperAdmin | PermissionOrigin::AdminRole { .. }
        )
    }

    pub fn level(&self, permission: Permission) -> PermissionLevel {
        self.set.level(permission)
    }

    pub fn allows(&self, permission: Permission, is_owner: bool) -> bool {
        self.set.allows(permission, is_owner)
    }

    /// `false` for combinations the catalogue does not define.
    pub fn can(&self, resource: Resource, action: Action, is_owner: bool) -> bool {
        Permission::lookup(resource, action).is_some_and(|p| self.allows(p, is_owner))
    }

    pub fn can_view(&self, resource: Resource, is_owner: bool) -> bool {
        self.can(resource, Action::View, is_owner)
    }

    pub fn can_create(&self, resource: Resource) -> bool {
        self.can(resource, Action::Create, false)
    }

    pub fn can_edit(&self, resource: Resource, is_owner: bool) -> bool {
        self.can(resource, Action::Edit, is_owner)
    }

    pub fn can_delete(&self, resource: Resource, is_owner: bool) -> bool {
        self.can(resource, Action::Delete, is_owner)
    }

    pub fn can_archive(&self, resource: Resource, is_owner: bool) -> bool {
        self.can(resource, Action::Archive, is_owner)
    }

    pub fn can_move(&self, resource: Resource, is_owner: bool) -> bool {
        self.can(resource, Action::Move, is_owner)
    }

    /// Fails closed while loading or on error.
    pub fn can_view_reports(&self) -> bool {
        self.allows(Permission::ReportView, false)
    }

    /// Any admin page. Fails closed while loading or on error.
    pub fn can_access_admin(&self) -> bool {
        [
            Permission::AdminRoles,
            Permission::AdminUsers,
            Permission::AdminSettings,
        ]
        .into_iter()
        .any(|p| self.allows(p, false))
    }
}

/// Bypasses every check regardless of the configured admin roles.
const SITE_ADMIN_ROLE: &str = "administrator";

struct CacheEntry {
    version: u64,
    permissions: Arc<EffectivePermissions>,
}

/// Resolves and caches effective permissions.
pub struct PermissionEvaluator {
    source: Arc<dyn PermissionSource>,
    super_admin_id: Option<u64>,
    admin_roles: Vec<String>,
    cache: Mutex<HashMap<(String, String), CacheEntry>>,
    version: AtomicU64,
}

impl PermissionEvaluator {
    pub fn new(source: Arc<dyn PermissionSource>, config: &PermissionsConfig) -> Self {
        let mut admin_roles = config.admin_roles.clone();
        if !admin_roles.iter().any(|role| role == SITE_ADMIN_ROLE) {
            admin_roles.push(SITE_ADMIN_ROLE.to_string());
        }
        Self {
            source,
            super_admin_id: config.super_admin_id,
            admin_roles,
            cache: Mutex::new(HashMap::new()),
            version: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Mark every cached set stale. Called after role or assignment
    /// mutations.
    pub fn invalidate(&self) {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(version, "permission cache invalidated");
    }

    fn bypass(&self, user: &UserContext) -> Option<PermissionOrigin> {
        if let Some(admin) = self.super_admin_id
            && user.uid == Some(admin)
        {
            return Some(PermissionOrigin::SuperAdmin);
        }
        user.roles
            .iter()
            .find(|role| self.admin_roles.iter().any(|admin| admin == *role))
            .map(|role| PermissionOrigin::AdminRole { role: role.clone() })
    }

    fn cached(&self, key: &(String, String)) -> Option<Arc<EffectivePermissions>> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(key)
            .filter(|entry| entry.version == self.version())
            .map(|entry| entry.permissions.clone())
    }

    /// Resolve without a liveness guard.
    pub async fn resolve(&self, workspace_id: &str, user: &UserContext) -> Arc<EffectivePermissions> {
        let never = CancellationToken::new();
        match self.resolve_with(workspace_id, user, &never).await {
            Some(permissions) => permissions,
            None => Arc::new(EffectivePermissions::fallback()),
        }
    }

    /// Resolve, returning `None` if `cancel` fired while fetching or the
    /// source answered [`ApiError::Cancelled`]. The pending fetch is dropped
    /// as soon as `cancel` fires, and a cancelled resolution never touches
    /// the cache.
    pub async fn resolve_with(
        &self,
        workspace_id: &str,
        user: &UserContext,
        cancel: &CancellationToken,
    ) -> Option<Arc<EffectivePermissions>> {
        if let Some(origin) = self.bypass(user) {
            return Some(Arc::new(EffectivePermissions::everything(origin)));
        }

        let key = (workspace_id.to_string(), user.id.clone());
        if let Some(hit) = self.cached(&key) {
            return Some(hit);
        }

        let version = self.version();
        // Dropping the fetch on cancellation aborts any request in flight.
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.fetch(workspace_id, &user.id) => result,
        };
        if cancel.is_cancelled() {
            tracing::debug!(workspace_id, "permission load cancelled; discarding result");
            return None;
        }

        let permissions = match result {
            Ok(permissions) => Arc::new(permissions),
            Err(e) if e.is_abort() => {
                tracing::debug!(workspace_id, "permission source aborted; discarding result");
                return None;
            }
            Err(e) => {
                tracing::warn!(workspace_id, user = %user.id, error = %e, "permission lookup failed; using fallback");
                return Some(Arc::new(EffectivePermissions::fallback()));
            }
        };

        if self.version() == version {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.insert(
                key,
                CacheEntry {
                    version,
                    permissions: permissions.clone(),
                },
            );
        }
        Some(permissions)
    }

    async fn fetch(&self, workspace_id: &str, user_id: &str) -> Result<EffectivePermissions, ApiError> {
        if let Some(assignment) = self.source.member_assignment(workspace_id, user_id).await? {
            match self.source.role(&assignment.role_id).await? {
                Some(role) => {
                    return Ok(EffectivePermissions {
                        origin: PermissionOrigin::Assignment {
                            role_id: role.id,
                            role_name: role.name,
                        },
                        set: role.permissions,
                    });
                }
                None => tracing::warn!(
                    workspace_id,
                    role_id = %assignment.role_id,
                    "assigned role not found; trying workspace default"
                ),
            }
        }

        if let Some(role) = self.source.default_role(workspace_id).await? {
            return Ok(EffectivePermissions {
                origin: PermissionOrigin::DefaultRole {
                    role_id: role.id,
                    role_name: role.name,
                },
                set: role.permissions,
            });
        }

        tracing::debug!(workspace_id, "no role for user; using fallback");
        Ok(EffectivePermissions::fallback())
    }
}

/// Permission state owned by one view.
///
/// Predicates answer with the loading posture until [`load`](Self::load)
/// completes. Closing the handle (or dropping it) cancels its token, after
/// which in-flight loads are discarded.
pub struct PermissionHandle {
    state: RwLock<Arc<EffectivePermissions>>,
    cancel: CancellationToken,
}

impl Default for PermissionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionHandle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(EffectivePermissions::loading())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolve and store. Returns `false` if the handle was closed first.
    pub async fn load(
        &self,
        evaluator: &PermissionEvaluator,
        workspace_id: &str,
        user: &UserContext,
    ) -> bool {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(EffectivePermissions::loading());
        let Some(permissions) = evaluator.resolve_with(workspace_id, user, &self.cancel).await
        else {
            return false;
        };
        if self.cancel.is_cancelled() {
            return false;
        }
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = permissions;
        true
    }

    pub fn current(&self) -> Arc<EffectivePermissions> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loading(&self) -> bool {
        self.current().origin == PermissionOrigin::Loading
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PermissionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

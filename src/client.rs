//! [`TaskboardClient`]: one session, wired end to end.
//!
//! ```text
//!              ┌──────────────── SessionContext ───────────────┐
//!              │ TokenStore   CsrfCache   broadcast<SessionEvent>│
//!              └──────▲────────────▲──────────────▲─────────────┘
//!                     │            │              │
//! AuthClient ─────────┤            │              │
//! ApiClient ──────────┴────────────┘              │
//! SessionMonitor ─────────────────────────────────┘
//! PermissionEvaluator ──► JsonApiPermissionSource ──► ApiClient
//! ```

use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::api::{self, CurrentUser, PresenceHeartbeat};
use crate::auth::AuthClient;
use crate::config::Config;
use crate::errors::{ApiError, ConfigError, LoginError, UploadError};
use crate::http::ApiClient;
use crate::navigation::Navigator;
use crate::permissions::{
    EffectivePermissions, JsonApiPermissionSource, PermissionEvaluator, PermissionHandle,
    UserContext,
};
use crate::session::{
    MonitorSettings, SessionContext, SessionEvent, SessionMonitor, TokenStorage,
};
use crate::transform::{Attachment, MemberRoleAssignment, WorkspaceRole};

pub struct TaskboardClient {
    config: Config,
    ctx: Arc<SessionContext>,
    auth: Arc<AuthClient>,
    api: ApiClient,
    monitor: SessionMonitor,
    permissions: PermissionEvaluator,
}

impl TaskboardClient {
    pub fn new(
        config: Config,
        storage: Box<dyn TokenStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConfigError::HttpClient)?;
        Self::with_http(config, http, storage, navigator)
    }

    pub fn with_http(
        config: Config,
        http: reqwest::Client,
        storage: Box<dyn TokenStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ctx = Arc::new(SessionContext::new(storage));
        let auth = Arc::new(AuthClient::new(http.clone(), &config, ctx.clone())?);
        let api = ApiClient::new(http, &config, auth.clone(), navigator.clone())?;
        let monitor = SessionMonitor::new(
            ctx.clone(),
            auth.clone(),
            navigator,
            MonitorSettings::from(&config),
        );
        let permissions = PermissionEvaluator::new(
            Arc::new(JsonApiPermissionSource::new(api.clone())),
            &config.permissions,
        );
        Ok(Self {
            config,
            ctx,
            auth,
            api,
            monitor,
            permissions,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.permissions
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.ctx.subscribe()
    }

    // --- session lifecycle ---

    /// Log in and start monitoring the new session.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), LoginError> {
        self.auth.login(username, password).await?;
        self.permissions.invalidate();
        self.monitor.start();
        Ok(())
    }

    /// Resume a stored session. Monitoring starts only if the stored access
    /// token is still valid.
    pub fn restore(&self) -> bool {
        if self.ctx.tokens().is_valid_at(Utc::now()) {
            self.monitor.start();
            tracing::debug!("restored stored session");
            true
        } else {
            false
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.ctx.tokens().is_valid_at(Utc::now())
    }

    pub fn logout(&self) {
        self.monitor.stop();
        self.auth.logout();
        self.permissions.invalidate();
    }

    pub async fn refresh(&self) -> Option<String> {
        self.auth.refresh_access_token().await
    }

    /// "Extend session" from an `expiring` warning.
    pub async fn extend_session(&self) -> bool {
        self.monitor.extend().await
    }

    pub fn dismiss_expiry_warning(&self) {
        self.monitor.dismiss();
    }

    // --- users and permissions ---

    pub async fn me(&self) -> Result<CurrentUser, ApiError> {
        api::me::current_user(&self.api).await
    }

    pub async fn permissions(
        &self,
        workspace_id: &str,
        user: &UserContext,
    ) -> Arc<EffectivePermissions> {
        self.permissions.resolve(workspace_id, user).await
    }

    /// Permissions of the logged-in user.
    pub async fn my_permissions(
        &self,
        workspace_id: &str,
    ) -> Result<Arc<EffectivePermissions>, ApiError> {
        let me = self.me().await?;
        Ok(self.permissions(workspace_id, &me.user_context()).await)
    }

    /// Fill a view-owned handle; see [`PermissionHandle::load`].
    pub async fn load_permissions(
        &self,
        handle: &PermissionHandle,
        workspace_id: &str,
        user: &UserContext,
    ) -> bool {
        handle.load(&self.permissions, workspace_id, user).await
    }

    // --- roles ---

    pub async fn list_roles(&self, workspace_id: Option<&str>) -> Result<Vec<WorkspaceRole>, ApiError> {
        api::roles::list_roles(&self.api, workspace_id).await
    }

    pub async fn create_role(&self, role: &WorkspaceRole) -> Result<WorkspaceRole, ApiError> {
        let created = api::roles::create_role(&self.api, role).await?;
        self.permissions.invalidate();
        Ok(created)
    }

    pub async fn update_role(&self, id: &str, changes: Value) -> Result<WorkspaceRole, ApiError> {
        let updated = api::roles::update_role(&self.api, id, changes).await?;
        self.permissions.invalidate();
        Ok(updated)
    }

    pub async fn delete_role(&self, id: &str) -> Result<(), ApiError> {
        api::roles::delete_role(&self.api, id).await?;
        self.permissions.invalidate();
        Ok(())
    }

    pub async fn assign_role(
        &self,
        workspace_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<MemberRoleAssignment, ApiError> {
        let assignment = api::roles::assign_role(&self.api, workspace_id, user_id, role_id).await?;
        self.permissions.invalidate();
        Ok(assignment)
    }

    pub async fn remove_assignment(&self, assignment_id: &str) -> Result<(), ApiError> {
        api::roles::remove_assignment(&self.api, assignment_id).await?;
        self.permissions.invalidate();
        Ok(())
    }

    // --- attachments and presence ---

    pub async fn upload_attachment(&self, card_id: &str, path: &Path) -> Result<Attachment, UploadError> {
        api::attachments::upload_file(&self.api, card_id, path, self.config.uploads.max_bytes).await
    }

    pub fn start_presence(&self, board_id: &str) -> PresenceHeartbeat {
        PresenceHeartbeat::start(
            self.api.clone(),
            board_id,
            self.config.heartbeat_interval(),
        )
    }
}

impl std::fmt::Debug for TaskboardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskboardClient")
            .field("base_url", &self.config.server.base_url)
            .field("authenticated", &self.is_authenticated())
            .field("monitoring", &self.monitor.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::session::MemoryStorage;

    fn client() -> TaskboardClient {
        TaskboardClient::new(
            Config::for_base_url("http://127.0.0.1:9", "web"),
            Box::new(MemoryStorage::new()),
            Arc::new(RecordingNavigator::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_missing_client_id() {
        let result = TaskboardClient::new(
            Config::default(),
            Box::new(MemoryStorage::new()),
            Arc::new(RecordingNavigator::new()),
        );
        assert!(matches!(result, Err(ConfigError::MissingClientId)));
    }

    #[tokio::test]
    async fn test_restore_requires_valid_token() {
        let client = client();
        assert!(!client.restore());
        assert!(!client.monitor().is_running());

        client.session().tokens().set_access_token(Some("a".into()));
        client
            .session()
            .tokens()
            .set_expires_at(Some(Utc::now() + chrono::Duration::hours(1)));
        assert!(client.restore());
        assert!(client.monitor().is_running());

        client.logout();
        assert!(!client.monitor().is_running());
        assert!(client.session().tokens().access_token().is_none());
    }

    #[tokio::test]
    async fn test_logout_bumps_permission_version() {
        let client = client();
        let before = client.evaluator().version();
        client.logout();
        assert!(client.evaluator().version() > before);
    }
}

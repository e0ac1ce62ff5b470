//! Authenticated HTTP access to the backend.
//!
//! Every request goes through [`ApiClient::execute`], which applies the
//! header and retry policy:
//!
//! 1. `Authorization: Bearer` whenever an access token is stored.
//! 2. `X-CSRF-Token` on POST/PATCH/PUT/DELETE, fetched once and cached.
//! 3. 401 → one refresh, one retry. A failed refresh or a second 401 sends
//!    the user to login and yields [`ApiError::Unauthorized`].
//! 4. 403 mentioning `csrf` → drop the cached token, fetch a fresh one,
//!    retry once. A second CSRF 403 is returned as a backend error.

pub mod request;

use reqwest::header::ACCEPT;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use taskboard_common::{Document, PrimaryData, Query, Resource};

use crate::auth::AuthClient;
use crate::config::Config;
use crate::errors::{ApiError, ConfigError, GENERIC_FAILURE};
use crate::navigation::{LoginRedirect, Navigator};
use crate::session::SessionContext;

pub use request::{ApiRequest, FilePart, JSONAPI_MEDIA_TYPE, RequestBody};

pub const CSRF_HEADER: &str = "X-CSRF-Token";
const CSRF_TOKEN_PATH: &str = "session/token";

/// Upper bound on pages walked by [`ApiClient::get_all`].
const MAX_PAGES: usize = 100;

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    jsonapi_path: String,
    auth: Arc<AuthClient>,
    navigator: Arc<dyn Navigator>,
}

/// Cheaply cloneable handle; clones share the session.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("jsonapi_path", &self.inner.jsonapi_path)
            .finish()
    }
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        config: &Config,
        auth: Arc<AuthClient>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.base_url()?,
                jsonapi_path: config.server.jsonapi_path.trim_matches('/').to_string(),
                auth,
                navigator,
            }),
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.inner.auth.session()
    }

    pub fn auth(&self) -> &Arc<AuthClient> {
        &self.inner.auth
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Absolute URL for a path relative to the backend root.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ApiError::InvalidUrl(path.to_string()))
    }

    /// Relative path of a JSON:API collection: `node--card` → `jsonapi/node/card`.
    pub fn resource_path(&self, kind: &str) -> String {
        format!("{}/{}", self.inner.jsonapi_path, kind.replace("--", "/"))
    }

    /// The cached CSRF token, fetching it when absent.
    pub async fn csrf_token(&self) -> Result<String, ApiError> {
        self.session()
            .csrf()
            .get_or_fetch(|| self.fetch_csrf_token())
            .await
    }

    async fn fetch_csrf_token(&self) -> Result<String, ApiError> {
        let resp = self
            .inner
            .http
            .get(self.url(CSRF_TOKEN_PATH)?)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Csrf(format!("token endpoint returned {}", status)));
        }
        let token = resp.text().await?.trim().to_string();
        if token.is_empty() {
            return Err(ApiError::Csrf("token endpoint returned an empty body".into()));
        }
        tracing::debug!("fetched CSRF token");
        Ok(token)
    }

    async fn send_once(
        &self,
        req: &ApiRequest,
        token: Option<&str>,
        with_csrf: bool,
    ) -> Result<Response, ApiError> {
        let mut builder = self
            .inner
            .http
            .request(req.method.clone(), self.url(&req.path)?)
            .header(ACCEPT, req.accept());
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if with_csrf {
            let csrf = self.csrf_token().await?;
            builder = builder.header(CSRF_HEADER, csrf);
        }
        let builder = req.apply_body(builder)?;
        Ok(builder.send().await?)
    }

    fn unauthorized(&self) -> ApiError {
        self.inner
            .navigator
            .redirect_to_login(LoginRedirect::Unauthorized);
        ApiError::Unauthorized
    }

    /// Send `req` under the retry policy. Only 2xx responses are returned;
    /// everything else becomes an [`ApiError`].
    pub async fn execute(&self, req: &ApiRequest) -> Result<Response, ApiError> {
        let mut token = self.session().tokens().access_token();
        let mut refreshed = false;
        let mut csrf_retried = false;

        loop {
            let with_csrf = req.is_mutating() || csrf_retried;
            let resp = self.send_once(req, token.as_deref(), with_csrf).await?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED {
                if refreshed {
                    tracing::info!(path = %req.path, "still unauthorized after refresh");
                    return Err(self.unauthorized());
                }
                refreshed = true;
                match self.inner.auth.refresh_after(token.as_deref()).await {
                    Some(fresh) => {
                        tracing::debug!(path = %req.path, "retrying with refreshed token");
                        token = Some(fresh);
                        continue;
                    }
                    None => return Err(self.unauthorized()),
                }
            }

            if status == StatusCode::FORBIDDEN {
                let body = resp.text().await.unwrap_or_default();
                if !csrf_retried && body.to_lowercase().contains("csrf") {
                    tracing::debug!(path = %req.path, "CSRF token rejected; refetching");
                    csrf_retried = true;
                    self.session().csrf().invalidate();
                    continue;
                }
                return Err(backend_error(status, &body));
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let err = backend_error(status, &body);
                tracing::debug!(path = %req.path, status = status.as_u16(), error = %err, "request failed");
                return Err(err);
            }

            return Ok(resp);
        }
    }

    /// Execute and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, req: &ApiRequest) -> Result<T, ApiError> {
        let resp = self.execute(req).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Execute and discard the body. Accepts any 2xx, including 204.
    pub async fn send_empty(&self, req: &ApiRequest) -> Result<(), ApiError> {
        self.execute(req).await?;
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(&ApiRequest::get(path)).await
    }

    /// `GET` a JSON:API collection.
    pub async fn get_document(&self, kind: &str, query: &Query) -> Result<Document, ApiError> {
        let req = ApiRequest::get(self.resource_path(kind))
            .with_query(query)
            .expect_jsonapi();
        self.send_json(&req).await
    }

    /// `GET` one JSON:API resource by id.
    pub async fn get_resource(
        &self,
        kind: &str,
        id: &str,
        query: &Query,
    ) -> Result<Document, ApiError> {
        let req = ApiRequest::get(format!("{}/{}", self.resource_path(kind), id))
            .with_query(query)
            .expect_jsonapi();
        self.send_json(&req).await
    }

    /// Walk every page of a collection, merging `included` without
    /// duplicates.
    pub async fn get_all(
        &self,
        kind: &str,
        query: &Query,
        page_size: u32,
    ) -> Result<Document, ApiError> {
        let mut merged = Document::default();
        let mut data = Vec::new();

        for page in 0..MAX_PAGES {
            let offset = page as u32 * page_size;
            let doc = self
                .get_document(kind, &query.clone().page(page_size, offset))
                .await?;
            let more = doc.has_next_page();
            for included in doc.included.iter() {
                if merged.find_included(&included.kind, &included.id).is_none() {
                    merged.included.push(included.clone());
                }
            }
            let resources = doc.into_resources();
            let fetched = resources.len();
            data.extend(resources);
            if !more || fetched < page_size as usize {
                break;
            }
        }

        merged.data = Some(PrimaryData::Many(data));
        Ok(merged)
    }

    /// `POST` a new resource; returns the created resource.
    pub async fn create_resource(&self, resource: Resource) -> Result<Resource, ApiError> {
        let req = ApiRequest::post(self.resource_path(&resource.kind))
            .document(Document::from_resource(resource));
        self.single_from(&req).await
    }

    /// `PATCH` an existing resource; only the attributes and relationships
    /// present on `resource` are sent.
    pub async fn update_resource(&self, resource: Resource) -> Result<Resource, ApiError> {
        let path = format!("{}/{}", self.resource_path(&resource.kind), resource.id);
        let req = ApiRequest::patch(path).document(Document::from_resource(resource));
        self.single_from(&req).await
    }

    pub async fn delete_resource(&self, kind: &str, id: &str) -> Result<(), ApiError> {
        let req = ApiRequest::delete(format!("{}/{}", self.resource_path(kind), id)).expect_jsonapi();
        self.send_empty(&req).await
    }

    async fn single_from(&self, req: &ApiRequest) -> Result<Resource, ApiError> {
        let doc: Document = self.send_json(req).await?;
        doc.into_resources()
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Backend {
                status: 200,
                detail: "Response carried no resource".to_string(),
            })
    }
}

/// Build a [`ApiError::Backend`] from a failed response body.
pub fn backend_error(status: StatusCode, body: &str) -> ApiError {
    ApiError::Backend {
        status: status.as_u16(),
        detail: extract_detail(body),
    }
}

/// Pick the most specific human-readable message from an error body:
/// JSON:API `errors[].detail`/`title`, then `message`, `error_description`
/// and `error`. Unparsable bodies get the generic message.
pub fn extract_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return GENERIC_FAILURE.to_string();
    };

    if let Ok(doc) = serde_json::from_value::<Document>(value.clone())
        && let Some(detail) = doc.error_detail()
        && !detail.is_empty()
    {
        return detail.to_string();
    }

    ["message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::RecordingNavigator;

    fn client(base: &str) -> ApiClient {
        let config = Config::for_base_url(base, "web");
        let ctx = Arc::new(SessionContext::in_memory());
        let auth = Arc::new(AuthClient::new(reqwest::Client::new(), &config, ctx).unwrap());
        ApiClient::new(
            reqwest::Client::new(),
            &config,
            auth,
            Arc::new(RecordingNavigator::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_resource_path_splits_entity_and_bundle() {
        let api = client("http://localhost:8080");
        assert_eq!(api.resource_path("node--card"), "jsonapi/node/card");
        assert_eq!(
            api.resource_path("workspace_role--workspace_role"),
            "jsonapi/workspace_role/workspace_role"
        );
    }

    #[test]
    fn test_url_joins_under_base_path() {
        let api = client("https://tasks.example.com/app");
        assert_eq!(
            api.url("/api/me").unwrap().as_str(),
            "https://tasks.example.com/app/api/me"
        );
        assert_eq!(
            api.url("session/token").unwrap().as_str(),
            "https://tasks.example.com/app/session/token"
        );
    }

    #[test]
    fn test_extract_detail_prefers_jsonapi_errors() {
        let body = r#"{"errors":[{"status":"422","title":"Unprocessable","detail":"title: This value should not be null."}],"message":"ignored"}"#;
        assert_eq!(extract_detail(body), "title: This value should not be null.");
    }

    #[test]
    fn test_extract_detail_falls_back_through_fields() {
        assert_eq!(extract_detail(r#"{"message":"Card is locked"}"#), "Card is locked");
        assert_eq!(
            extract_detail(r#"{"error":"invalid_request","error_description":"Missing field"}"#),
            "Missing field"
        );
        assert_eq!(extract_detail(r#"{"error":"boom"}"#), "boom");
    }

    #[test]
    fn test_extract_detail_generic_for_unparsable_body() {
        assert_eq!(extract_detail("<html>500</html>"), GENERIC_FAILURE);
        assert_eq!(extract_detail(r#"{"message":""}"#), GENERIC_FAILURE);
        assert_eq!(extract_detail(""), GENERIC_FAILURE);
    }

    #[test]
    fn test_backend_error_keeps_status() {
        let err = backend_error(StatusCode::CONFLICT, r#"{"message":"Already archived"}"#);
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "Already archived");
    }
}

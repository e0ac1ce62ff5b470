//! Re-issuable request descriptions.
//!
//! A `reqwest::RequestBuilder` is consumed by `send`, so the retry paths in
//! [`super::ApiClient`] rebuild every attempt from an [`ApiRequest`].

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use taskboard_common::{Document, Query};

use crate::errors::ApiError;

pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// One file field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    JsonApi(Box<Document>),
    Multipart(Vec<FilePart>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the backend base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Ask for `application/vnd.api+json` responses
    pub jsonapi: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            jsonapi: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_query(mut self, query: &Query) -> Self {
        self.query.extend(query.to_pairs());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn document(mut self, document: Document) -> Self {
        self.body = RequestBody::JsonApi(Box::new(document));
        self.jsonapi = true;
        self
    }

    pub fn multipart(mut self, parts: Vec<FilePart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn expect_jsonapi(mut self) -> Self {
        self.jsonapi = true;
        self
    }

    /// State-changing verbs carry the CSRF header.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PATCH | Method::PUT | Method::DELETE
        )
    }

    pub fn accept(&self) -> &'static str {
        if self.jsonapi {
            JSONAPI_MEDIA_TYPE
        } else {
            JSON_MEDIA_TYPE
        }
    }

    /// Attach the body to `builder`. Multipart forms are rebuilt from the
    /// stored bytes on every attempt.
    pub(crate) fn apply_body(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        Ok(match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::JsonApi(document) => builder
                .header(reqwest::header::CONTENT_TYPE, JSONAPI_MEDIA_TYPE)
                .body(serde_json::to_vec(document)?),
            RequestBody::Multipart(parts) => {
                let mut form = Form::new();
                for part in parts {
                    let file = Part::bytes(part.bytes.clone())
                        .file_name(part.file_name.clone())
                        .mime_str(&part.mime)?;
                    form = form.part(part.field.clone(), file);
                }
                builder.multipart(form)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_verbs() {
        assert!(!ApiRequest::get("api/me").is_mutating());
        assert!(ApiRequest::post("api/roles").is_mutating());
        assert!(ApiRequest::patch("api/roles/1").is_mutating());
        assert!(ApiRequest::put("api/roles/1").is_mutating());
        assert!(ApiRequest::delete("api/roles/1").is_mutating());
        assert!(!ApiRequest::new(Method::HEAD, "api/me").is_mutating());
    }

    #[test]
    fn test_query_builder_pairs_are_appended() {
        let query = Query::new().filter("title", "Docs").page(10, 0);
        let req = ApiRequest::get("jsonapi/node/card")
            .with_query(&query)
            .query_pair("extra", "1");
        assert_eq!(req.query.first().map(|(k, _)| k.as_str()), Some("filter[title]"));
        assert_eq!(req.query.last(), Some(&("extra".to_string(), "1".to_string())));
    }

    #[test]
    fn test_document_body_switches_accept_header() {
        let req = ApiRequest::get("api/me");
        assert_eq!(req.accept(), JSON_MEDIA_TYPE);

        let req = ApiRequest::post("jsonapi/node/card").document(Document::default());
        assert_eq!(req.accept(), JSONAPI_MEDIA_TYPE);
        assert!(matches!(req.body, RequestBody::JsonApi(_)));
    }

    #[test]
    fn test_request_is_cloneable_for_retries() {
        let req = ApiRequest::post("api/cards/1/attachments").multipart(vec![FilePart {
            field: "file".into(),
            file_name: "a.txt".into(),
            mime: "text/plain".into(),
            bytes: b"hello".to_vec(),
        }]);
        let again = req.clone();
        assert_eq!(again.body, req.body);
        assert_eq!(again.method, Method::POST);
    }
}

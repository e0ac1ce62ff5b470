use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskboard_common::{Document, Resource};

use super::{timestamp_attr, types};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    /// As sent by the server; may be root-relative
    pub url: Option<String>,
    pub uploader_id: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub is_image: bool,
}

impl Attachment {
    pub fn from_resource(resource: &Resource) -> Self {
        let mime_type = resource
            .attr_str("filemime")
            .unwrap_or("application/octet-stream")
            .to_string();
        // `uri` is either a plain string or `{value, url}`.
        let url = match resource.attr("uri") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(obj)) => obj
                .get("url")
                .or_else(|| obj.get("value"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        Self {
            id: resource.id.clone(),
            file_name: resource.attr_str("filename").unwrap_or_default().to_string(),
            is_image: mime_type.starts_with("image/"),
            mime_type,
            size: resource
                .attr_i64("filesize")
                .and_then(|s| u64::try_from(s).ok())
                .unwrap_or(0),
            url,
            uploader_id: resource.related_id("uid").map(str::to_string),
            created: timestamp_attr(resource, "created"),
        }
    }

    /// Resolve the URL against the backend base. Stream-wrapper URIs such
    /// as `public://` cannot be resolved and yield `None`.
    pub fn absolute_url(&self, base: &Url) -> Option<Url> {
        let raw = self.url.as_deref()?;
        if raw.contains("://") && !raw.starts_with("http") {
            return None;
        }
        base.join(raw).ok()
    }

    /// Human-readable size, e.g. `1.5 MB`.
    pub fn display_size(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = self.size as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} B", self.size)
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

/// Attachments among a document's primary data and `included`.
pub fn attachments_from_document(doc: &Document) -> Vec<Attachment> {
    doc.resources()
        .into_iter()
        .chain(doc.included.iter())
        .filter(|r| r.kind == types::FILE)
        .map(Attachment::from_resource)
        .collect()
}

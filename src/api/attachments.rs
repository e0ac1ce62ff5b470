use std::path::Path;
use taskboard_common::{Document, Query};

use crate::errors::{ApiError, UploadError};
use crate::http::{ApiClient, ApiRequest, FilePart};
use crate::transform::attachments::attachments_from_document;
use crate::transform::{Attachment, types};

const FILE_FIELD: &str = "file";

fn upload_path(card_id: &str) -> String {
    format!("api/cards/{}/attachments", card_id)
}

fn check_size(file_name: &str, size: u64, limit: u64) -> Result<(), UploadError> {
    if size > limit {
        return Err(UploadError::TooLarge {
            file_name: file_name.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

/// Upload a file from disk. The size ceiling is checked before the file is
/// read; the MIME type is guessed from the extension.
pub async fn upload_file(
    api: &ApiClient,
    card_id: &str,
    path: &Path,
    max_bytes: u64,
) -> Result<Attachment, UploadError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    check_size(&file_name, metadata.len(), max_bytes)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    upload_bytes(api, card_id, &file_name, bytes, max_bytes).await
}

pub async fn upload_bytes(
    api: &ApiClient,
    card_id: &str,
    file_name: &str,
    bytes: Vec<u8>,
    max_bytes: u64,
) -> Result<Attachment, UploadError> {
    check_size(file_name, bytes.len() as u64, max_bytes)?;
    let mime = mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let size = bytes.len();

    let req = ApiRequest::post(upload_path(card_id)).multipart(vec![FilePart {
        field: FILE_FIELD.to_string(),
        file_name: file_name.to_string(),
        mime: mime.clone(),
        bytes,
    }]);
    let doc: Document = api.send_json(&req).await?;
    let attachment = doc
        .single()
        .map(Attachment::from_resource)
        .ok_or_else(|| ApiError::Backend {
            status: 200,
            detail: "Upload response carried no file".to_string(),
        })?;
    tracing::info!(card_id, file_name, mime, size, "attachment uploaded");
    Ok(attachment)
}

/// Attachments of a card.
pub async fn list_attachments(api: &ApiClient, card_id: &str) -> Result<Vec<Attachment>, ApiError> {
    let query = Query::new().include("field_attachments");
    let doc = api.get_resource(types::CARD, card_id, &query).await?;
    let mut attachments = attachments_from_document(&doc);
    attachments.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
    Ok(attachments)
}

pub async fn delete_attachment(api: &ApiClient, file_id: &str) -> Result<(), ApiError> {
    api.delete_resource(types::FILE, file_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_path() {
        assert_eq!(upload_path("c1"), "api/cards/c1/attachments");
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        assert!(check_size("a.png", 10, 10).is_ok());
        match check_size("a.png", 11, 10) {
            Err(UploadError::TooLarge { size, limit, .. }) => {
                assert_eq!(size, 11);
                assert_eq!(limit, 10);
            }
            other => panic!("Expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_mime_guess_from_name() {
        let guess = |name: &str| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        };
        assert_eq!(guess("scan.png"), "image/png");
        assert_eq!(guess("notes.pdf"), "application/pdf");
        assert_eq!(guess("blob"), "application/octet-stream");
    }
}

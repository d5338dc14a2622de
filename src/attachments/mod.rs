use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::security::path_guard::sanitize_filename;
use crate::shared::schema::{attachments, tickets};
use crate::shared::state::AppState;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "pdf", "txt", "log", "zip"];

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = attachments)]
pub struct Attachment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub filename: String,
    pub path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Wire shape: the storage path is replaced with the download endpoint.
#[derive(Debug, Serialize)]
pub struct AttachmentMeta {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub filename: String,
    pub path: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentMeta {
    fn from(attachment: Attachment) -> Self {
        Self {
            path: format!("/api/attachments/{}/download", attachment.id),
            id: attachment.id,
            ticket_id: attachment.ticket_id,
            filename: attachment.filename,
            uploaded_at: attachment.uploaded_at,
        }
    }
}

pub fn file_extension(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

pub fn allowed_extension(name: &str) -> bool {
    file_extension(name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AttachmentMeta>), ApiError> {
    let mut conn = state.conn.get()?;
    let ticket_exists: Option<Uuid> = tickets::table
        .find(ticket_id)
        .select(tickets::id)
        .first(&mut conn)
        .optional()?;
    if ticket_exists.is_none() {
        return Err(ApiError::NotFound("ticket"));
    }

    let mut file_name: Option<String> = None;
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("failed to read file field: {e}")))?
                    .to_vec(),
            );
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::validation("file field required"))?;
    let file_name = file_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("empty filename"))?;

    let ext = file_extension(&file_name).unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::validation(format!("extension .{ext} not allowed")));
    }

    let safe = sanitize_filename(&file_name);
    let dest = state.config.upload.dir.join(&safe);
    tokio::fs::write(&dest, &file_data)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store upload {}: {e}", dest.display())))?;

    let attachment = Attachment {
        id: Uuid::new_v4(),
        ticket_id,
        filename: safe,
        path: dest.display().to_string(),
        uploaded_at: Utc::now(),
    };

    diesel::insert_into(attachments::table)
        .values(&attachment)
        .execute(&mut conn)?;

    Ok((StatusCode::CREATED, Json(attachment.into())))
}

pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Path(attachment_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let mut conn = state.conn.get()?;
    let attachment: Attachment = attachments::table
        .find(attachment_id)
        .first(&mut conn)
        .optional()?
        .ok_or(ApiError::NotFound("attachment"))?;

    let bytes = tokio::fs::read(&attachment.path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound("attachment")
        } else {
            ApiError::Internal(format!("failed to read {}: {e}", attachment.path))
        }
    })?;

    let content_type = mime_guess::from_path(&attachment.filename)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", attachment.filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(format!("failed to build download response: {e}")))
}

pub fn configure_attachment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets/:id/attachments", post(upload_attachment))
        .route("/api/attachments/:id/download", get(download_attachment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_allow_list() {
        assert!(allowed_extension("report.pdf"));
        assert!(allowed_extension("screenshot.PNG"));
        assert!(allowed_extension("archive.zip"));
        assert!(!allowed_extension("malware.exe"));
        assert!(!allowed_extension("script.sh"));
        assert!(!allowed_extension("no_extension"));
    }

    #[test]
    fn test_extension_uses_last_dot() {
        assert!(allowed_extension("report.final.pdf"));
        assert!(!allowed_extension("report.pdf.exe"));
    }

    #[test]
    fn test_meta_path_is_download_endpoint() {
        let attachment = Attachment {
            id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            filename: "report.pdf".to_string(),
            path: "/srv/uploads/report.pdf".to_string(),
            uploaded_at: Utc::now(),
        };
        let id = attachment.id;
        let meta: AttachmentMeta = attachment.into();
        assert_eq!(meta.path, format!("/api/attachments/{id}/download"));
    }

    #[tokio::test]
    async fn test_stored_bytes_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let safe = sanitize_filename("weekly report.pdf");
        let dest = dir.path().join(&safe);
        let payload = b"%PDF-1.7 fake payload".to_vec();

        tokio::fs::write(&dest, &payload).await.expect("write");
        let read_back = tokio::fs::read(&dest).await.expect("read");

        assert_eq!(read_back, payload);
    }
}

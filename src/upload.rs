//! Multipart file upload.
//!
//! `POST /api/upload` accepts one multipart field named `file`, checks its
//! MIME type against `[uploads].allowed_types`, and writes it into
//! `[uploads].dir` under a generated name that keeps the original
//! extension. Stored files are served back by `GET /api/uploads/{filename}`.

use std::path::Path;

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use skillsync_core::models::Attachment;
use uuid::Uuid;

use crate::config::UploadsConfig;
use crate::server::{bad_request, AppError, AppState};

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// URL path prefix under which stored files are served.
pub const UPLOADS_ROUTE: &str = "/api/uploads";

/// Lowercased extension of `name` including the dot, if it is purely
/// alphanumeric.
fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Name the file is stored under: the attachment id plus the original
/// extension. Never contains path separators.
pub fn stored_name(id: &str, original_name: &str) -> String {
    format!("{}{}", id, extension(original_name).unwrap_or_default())
}

/// MIME type for common document extensions, used when the client sent no
/// `Content-Type` for the part.
fn guess_mime(original_name: &str) -> &'static str {
    match extension(original_name).as_deref() {
        Some(".pdf") => "application/pdf",
        Some(".doc") => "application/msword",
        Some(".docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some(".txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Strip parameters such as `; charset=utf-8`.
fn essence(mimetype: &str) -> &str {
    mimetype.split(';').next().unwrap_or(mimetype).trim()
}

/// Validate and write one uploaded file.
pub async fn save_file(
    config: &UploadsConfig,
    original_name: &str,
    mimetype: &str,
    data: &[u8],
) -> Result<Attachment, AppError> {
    if data.is_empty() {
        return Err(bad_request("uploaded file is empty"));
    }
    let mimetype = essence(mimetype).to_ascii_lowercase();
    if !config
        .allowed_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(&mimetype))
    {
        return Err(bad_request(format!(
            "file type '{}' is not allowed; accepted types: {}",
            mimetype,
            config.allowed_types.join(", ")
        )));
    }

    let id = Uuid::new_v4().to_string();
    let filename = stored_name(&id, original_name);

    tokio::fs::create_dir_all(&config.dir)
        .await
        .with_context(|| format!("Failed to create upload dir: {}", config.dir.display()))?;
    let path = config.dir.join(&filename);
    tokio::fs::write(&path, data)
        .await
        .with_context(|| format!("Failed to write upload: {}", path.display()))?;

    tracing::info!(
        file = %filename,
        original = %original_name,
        size = data.len(),
        "stored upload"
    );

    Ok(Attachment {
        id,
        url: Some(format!("{}/{}", UPLOADS_ROUTE, filename)),
        filename,
        original_name: original_name.to_string(),
        mimetype,
        size: data.len() as u64,
    })
}

fn multipart_error(err: MultipartError) -> AppError {
    let mut e = bad_request(err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        e.status = StatusCode::PAYLOAD_TOO_LARGE;
        e.code = "payload_too_large".to_string();
    }
    e
}

/// Handler for `POST /api/upload`.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Attachment>), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("upload")
            .to_string();
        let mimetype = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime(&original_name).to_string());
        let data = field.bytes().await.map_err(multipart_error)?;

        let attachment =
            save_file(&state.config.uploads, &original_name, &mimetype, &data).await?;
        return Ok((StatusCode::CREATED, Json(attachment)));
    }

    Err(bad_request(format!(
        "no file uploaded; expected multipart field '{}'",
        FILE_FIELD
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> UploadsConfig {
        UploadsConfig {
            dir: dir.path().join("uploads"),
            ..UploadsConfig::default()
        }
    }

    #[test]
    fn test_stored_name_keeps_extension_only() {
        assert_eq!(stored_name("abc", "Report.PDF"), "abc.pdf");
        assert_eq!(stored_name("abc", "../../etc/passwd"), "abc");
        assert_eq!(stored_name("abc", "notes.tar.gz"), "abc.gz");
        assert_eq!(stored_name("abc", "weird.p/df"), "abc");
    }

    #[test]
    fn test_guess_mime() {
        assert!(guess_mime("sop.docx").ends_with("wordprocessingml.document"));
        assert_eq!(guess_mime("notes.txt"), "text/plain");
        assert_eq!(guess_mime("image.png"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_save_file_writes_to_upload_dir() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);

        let attachment = save_file(&config, "sop.txt", "text/plain; charset=utf-8", b"step 1")
            .await
            .unwrap();
        assert_eq!(attachment.mimetype, "text/plain");
        assert_eq!(attachment.size, 6);
        assert_eq!(attachment.original_name, "sop.txt");
        assert!(attachment.filename.ends_with(".txt"));
        assert_eq!(
            attachment.url.as_deref(),
            Some(format!("/api/uploads/{}", attachment.filename).as_str())
        );

        let written = std::fs::read(config.dir.join(&attachment.filename)).unwrap();
        assert_eq!(written, b"step 1");
    }

    #[tokio::test]
    async fn test_save_file_rejects_disallowed_type() {
        let tmp = TempDir::new().unwrap();
        let err = save_file(&config(&tmp), "logo.png", "image/png", b"\x89PNG")
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("image/png"));
    }

    #[tokio::test]
    async fn test_save_file_rejects_empty() {
        let tmp = TempDir::new().unwrap();
        let err = save_file(&config(&tmp), "empty.txt", "text/plain", b"")
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(!tmp.path().join("uploads").exists());
    }
}

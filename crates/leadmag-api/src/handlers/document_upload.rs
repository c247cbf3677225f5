//! Document upload handler

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use leadmag_core::{AppError, AuthUser, DocumentResponse};
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;

struct UploadForm {
    filename: String,
    content_type: String,
    data: Vec<u8>,
    title: String,
    description: Option<String>,
}

/// `POST /api/v0/documents`: multipart `file` + `title` + optional
/// `description`. Runs the full upload-and-convert flow.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let form = parse_multipart(multipart).await?;

    let document = state
        .uploads
        .upload(
            user.user_id,
            &form.filename,
            &form.content_type,
            form.title,
            form.description,
            form.data,
        )
        .await?;

    Ok(Json(DocumentResponse::from(document)))
}

async fn parse_multipart(mut multipart: Multipart) -> Result<UploadForm, HttpAppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::BadRequest("file field missing filename".to_string()))?;
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?
                    .to_vec();
                file = Some((filename, content_type, data));
            }
            "title" => {
                title = Some(read_text_field(field).await?);
            }
            "description" => {
                let text = read_text_field(field).await?;
                if !text.trim().is_empty() {
                    description = Some(text);
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("missing file field".to_string()))?;
    let title = title.ok_or_else(|| AppError::BadRequest("missing title field".to_string()))?;

    Ok(UploadForm {
        filename,
        content_type,
        data,
        title,
        description,
    })
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read field: {}", e)))
}

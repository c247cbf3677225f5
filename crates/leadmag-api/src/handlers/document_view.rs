//! Public document view
//!
//! Serves the derived HTML to anonymous end-users. Inline content is
//! preferred; storage is the fallback for rows written before inline content
//! existed.

use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
};
use leadmag_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

/// `GET /api/v0/view/{id}`: derived HTML, 404 until conversion completes.
pub async fn view_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let document = state
        .documents
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

    if let Some(content) = document.html_content {
        return Ok(html_response(content));
    }

    let html_key = document
        .html_key
        .ok_or_else(|| AppError::NotFound(format!("Document {} is not converted yet", id)))?;

    let bytes = state.storage.download(&html_key).await?;
    let content = String::from_utf8(bytes)
        .map_err(|_| AppError::Internal("stored HTML is not valid UTF-8".to_string()))?;

    Ok(html_response(content))
}

fn html_response(content: String) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        Html(content),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadmag_db::NewDocument;

    #[tokio::test]
    async fn test_view_unconverted_document_is_not_found() {
        let state = AppState::for_tests();
        let document = state
            .documents
            .create(NewDocument {
                owner_id: Uuid::new_v4(),
                title: "Guide".to_string(),
                description: None,
                pdf_key: "pdfs/guide.pdf".to_string(),
            })
            .await
            .unwrap();

        let result = view_document(State(state), Path(document.id)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_view_serves_inline_content() {
        let state = AppState::for_tests();
        let document = state
            .documents
            .create(NewDocument {
                owner_id: Uuid::new_v4(),
                title: "Guide".to_string(),
                description: None,
                pdf_key: "pdfs/guide.pdf".to_string(),
            })
            .await
            .unwrap();
        state
            .documents
            .attach_html(document.id, "html/abc.html", "<html><body>Hi</body></html>")
            .await
            .unwrap();

        let result = view_document(State(state), Path(document.id)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_view_unknown_document_is_not_found() {
        let state = AppState::for_tests();
        let result = view_document(State(state), Path(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}

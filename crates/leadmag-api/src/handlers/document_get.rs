//! Owner-scoped document retrieval

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use leadmag_core::{AppError, AuthUser, DocumentResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn clamp(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// `GET /api/v0/documents`: the caller's documents, newest first.
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DocumentResponse>>, HttpAppError> {
    let (limit, offset) = query.clamp();
    let documents = state
        .documents
        .list_by_owner(user.user_id, limit, offset)
        .await?;

    Ok(Json(
        documents.into_iter().map(DocumentResponse::from).collect(),
    ))
}

/// `GET /api/v0/documents/{id}`: single document, owner-scoped.
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let document = state
        .documents
        .get_owned(id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

    Ok(Json(DocumentResponse::from(document)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_clamps_limit_and_offset() {
        let query = ListQuery {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(query.clamp(), (MAX_LIMIT, 0));

        let query = ListQuery {
            limit: None,
            offset: None,
        };
        assert_eq!(query.clamp(), (DEFAULT_LIMIT, 0));

        let query = ListQuery {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(query.clamp(), (1, 20));
    }

    #[tokio::test]
    async fn test_get_document_scopes_to_owner() {
        use crate::state::AppState;
        use leadmag_db::NewDocument;

        let state = AppState::for_tests();
        let owner = Uuid::new_v4();
        let document = state
            .documents
            .create(NewDocument {
                owner_id: owner,
                title: "Guide".to_string(),
                description: None,
                pdf_key: "pdfs/guide.pdf".to_string(),
            })
            .await
            .unwrap();

        let found = get_document(
            State(state.clone()),
            Extension(AuthUser {
                user_id: owner,
                email: "owner@example.com".to_string(),
            }),
            Path(document.id),
        )
        .await;
        assert!(found.is_ok());

        let other = get_document(
            State(state),
            Extension(AuthUser {
                user_id: Uuid::new_v4(),
                email: "other@example.com".to_string(),
            }),
            Path(document.id),
        )
        .await;
        assert!(other.is_err());
    }
}

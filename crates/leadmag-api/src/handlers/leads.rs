//! Lead capture and retrieval

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use leadmag_core::{AppError, AuthUser, LeadResponse, NewLead};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::document_get::ListQuery;
use crate::state::AppState;

/// `POST /api/v0/view/{id}/leads`: public lead capture for a published
/// document.
pub async fn capture_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<NewLead>,
) -> Result<Json<LeadResponse>, HttpAppError> {
    payload.validate().map_err(AppError::from)?;

    // Leads only make sense against a live document
    state
        .documents
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

    let lead = state.leads.create(id, &payload.name, &payload.email).await?;

    tracing::info!(document_id = %id, lead_id = %lead.id, "lead captured");

    Ok(Json(LeadResponse::from(lead)))
}

/// `GET /api/v0/documents/{id}/leads`: captured leads for an owned document.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<LeadResponse>>, HttpAppError> {
    // Owner scoping happens on the document lookup
    state
        .documents
        .get_owned(id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

    let (limit, offset) = query.clamp();
    let leads = state.leads.list_by_document(id, limit, offset).await?;

    Ok(Json(leads.into_iter().map(LeadResponse::from).collect()))
}

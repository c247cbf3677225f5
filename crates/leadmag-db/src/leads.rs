//! Lead repository

use async_trait::async_trait;
use leadmag_core::models::Lead;
use leadmag_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Persistence seam for captured leads.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn create(
        &self,
        document_id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<Lead, AppError>;

    /// Leads captured for a document, newest first.
    async fn list_by_document(
        &self,
        document_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lead>, AppError>;
}

/// Postgres-backed lead repository
#[derive(Clone)]
pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadRepository {
    #[tracing::instrument(skip(self, email), fields(db.table = "leads", db.operation = "insert"))]
    async fn create(
        &self,
        document_id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<Postgres, Lead>(
            r#"
            INSERT INTO leads (id, document_id, name, email, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, document_id, name, email, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(document_id)
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "leads", db.operation = "select"))]
    async fn list_by_document(
        &self,
        document_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lead>, AppError> {
        let rows = sqlx::query_as::<Postgres, Lead>(
            r#"
            SELECT id, document_id, name, email, created_at
            FROM leads
            WHERE document_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(document_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

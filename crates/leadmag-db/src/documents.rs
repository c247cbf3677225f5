//! Document repository
//!
//! Owner-scoped reads, a single insert, and the one mutation the document row
//! ever sees: attaching the derived HTML artifact.

use async_trait::async_trait;
use leadmag_core::models::Document;
use leadmag_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Fields required to insert a document row. The derived-HTML columns start
/// NULL and are only ever set by `attach_html`.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub pdf_key: String,
}

/// Persistence seam for document rows.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, new: NewDocument) -> Result<Document, AppError>;

    /// Fetch by id regardless of owner (used by the public view path).
    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    /// Fetch by id, scoped to the owner.
    async fn get_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Document>, AppError>;

    /// List an owner's documents, newest first.
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, AppError>;

    /// Attach the derived HTML artifact. Fails with `Conflict` if the row
    /// already has one, `NotFound` if the row doesn't exist.
    async fn attach_html(
        &self,
        id: Uuid,
        html_key: &str,
        html_content: &str,
    ) -> Result<Document, AppError>;

    /// Documents that have a source PDF but no derived HTML yet, oldest
    /// first. Used by the reconciliation task.
    async fn list_unconverted(&self, limit: i64) -> Result<Vec<Document>, AppError>;
}

/// Postgres-backed document repository
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "documents", db.operation = "insert"))]
    async fn create(&self, new: NewDocument) -> Result<Document, AppError> {
        let row = sqlx::query_as::<Postgres, Document>(
            r#"
            INSERT INTO documents (id, owner_id, title, description, pdf_key, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, owner_id, title, description, pdf_key, html_key, html_content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.owner_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.pdf_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<Postgres, Document>(
            r#"
            SELECT id, owner_id, title, description, pdf_key, html_key, html_content, created_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn get_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<Postgres, Document>(
            r#"
            SELECT id, owner_id, title, description, pdf_key, html_key, html_content, created_at
            FROM documents
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, AppError> {
        let rows = sqlx::query_as::<Postgres, Document>(
            r#"
            SELECT id, owner_id, title, description, pdf_key, html_key, html_content, created_at
            FROM documents
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self, html_content), fields(db.table = "documents", db.operation = "update"))]
    async fn attach_html(
        &self,
        id: Uuid,
        html_key: &str,
        html_content: &str,
    ) -> Result<Document, AppError> {
        // The html_key IS NULL guard makes the attach first-write-wins even
        // if two conversions race across processes.
        let row = sqlx::query_as::<Postgres, Document>(
            r#"
            UPDATE documents
            SET html_key = $2, html_content = $3
            WHERE id = $1 AND html_key IS NULL
            RETURNING id, owner_id, title, description, pdf_key, html_key, html_content, created_at
            "#,
        )
        .bind(id)
        .bind(html_key)
        .bind(html_content)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(doc) => Ok(doc),
            None => match self.get(id).await? {
                Some(_) => Err(AppError::Conflict(format!(
                    "Document {} already has derived HTML",
                    id
                ))),
                None => Err(AppError::NotFound(format!("Document {} not found", id))),
            },
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn list_unconverted(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        let rows = sqlx::query_as::<Postgres, Document>(
            r#"
            SELECT id, owner_id, title, description, pdf_key, html_key, html_content, created_at
            FROM documents
            WHERE html_key IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

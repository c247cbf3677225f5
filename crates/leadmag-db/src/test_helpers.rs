//! In-memory repository implementations for testing
//!
//! Always compiled so dependent crates can substitute them behind the
//! `DocumentStore` / `LeadStore` traits without a database.

use crate::documents::{DocumentStore, NewDocument};
use crate::leads::LeadStore;
use async_trait::async_trait;
use chrono::Utc;
use leadmag_core::models::{Document, Lead};
use leadmag_core::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Document store backed by a process-local map
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    rows: Arc<Mutex<HashMap<Uuid, Document>>>,
    /// When set, `create` fails; simulates an insert failure for cleanup tests.
    fail_create: Arc<Mutex<bool>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_create(&self, fail: bool) {
        *self.fail_create.lock().unwrap() = fail;
    }

    pub fn insert_row(&self, doc: Document) {
        self.rows.lock().unwrap().insert(doc.id, doc);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, new: NewDocument) -> Result<Document, AppError> {
        if *self.fail_create.lock().unwrap() {
            return Err(AppError::Internal("simulated insert failure".to_string()));
        }
        let doc = Document {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            title: new.title,
            description: new.description,
            pdf_key: new.pdf_key,
            html_key: None,
            html_content: None,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn get_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&id)
            .filter(|d| d.owner_id == owner_id)
            .cloned())
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, AppError> {
        let mut docs: Vec<Document> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn attach_html(
        &self,
        id: Uuid,
        html_key: &str,
        html_content: &str,
    ) -> Result<Document, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let doc = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;
        if doc.html_key.is_some() {
            return Err(AppError::Conflict(format!(
                "Document {} already has derived HTML",
                id
            )));
        }
        doc.html_key = Some(html_key.to_string());
        doc.html_content = Some(html_content.to_string());
        Ok(doc.clone())
    }

    async fn list_unconverted(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        let mut docs: Vec<Document> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.html_key.is_none())
            .cloned()
            .collect();
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        docs.truncate(limit.max(0) as usize);
        Ok(docs)
    }
}

/// Lead store backed by a process-local vec
#[derive(Clone, Default)]
pub struct InMemoryLeadStore {
    rows: Arc<Mutex<Vec<Lead>>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn create(
        &self,
        document_id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<Lead, AppError> {
        let lead = Lead {
            id: Uuid::new_v4(),
            document_id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(lead.clone());
        Ok(lead)
    }

    async fn list_by_document(
        &self,
        document_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lead>, AppError> {
        let mut leads: Vec<Lead> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.document_id == document_id)
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

//! Upload orchestration
//!
//! The full document flow: validate the PDF, store it, insert the row, run
//! the conversion pipeline, publish the derived HTML and images, and attach
//! them to the row. Conversion failures leave the row without derived HTML;
//! the reconciler retries those later.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use leadmag_convert::{rewrite_image_sources, ConversionPipeline, FileValidator};
use leadmag_core::{AppError, Config, Document};
use leadmag_db::{DocumentStore, NewDocument};
use leadmag_storage::{keys, Storage};

use crate::error::HttpAppError;

pub struct UploadService {
    storage: Arc<dyn Storage>,
    documents: Arc<dyn DocumentStore>,
    pipeline: ConversionPipeline,
    validator: FileValidator,
    /// Document ids with a conversion in flight, to serialize retries
    /// against uploads within this process.
    in_flight: Mutex<HashSet<Uuid>>,
}

impl UploadService {
    pub fn new(
        config: &Config,
        storage: Arc<dyn Storage>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let pipeline = ConversionPipeline::new(
            storage.clone(),
            Duration::from_secs(config.convert_timeout_seconds()),
        );
        UploadService {
            storage,
            documents,
            pipeline,
            validator: FileValidator::new(config.max_document_size_bytes()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Run the full upload flow for an authenticated owner. Returns the
    /// Document row with derived HTML attached.
    pub async fn upload(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
        title: String,
        description: Option<String>,
        data: Vec<u8>,
    ) -> Result<Document, HttpAppError> {
        if title.trim().is_empty() {
            return Err(HttpAppError(AppError::InvalidInput(
                "title must not be empty".to_string(),
            )));
        }
        self.validator.validate(filename, content_type, &data)?;

        let pdf_key = keys::pdf_key(filename);
        self.storage
            .upload_with_key(&pdf_key, data, "application/pdf")
            .await?;

        let document = match self
            .documents
            .create(NewDocument {
                owner_id,
                title,
                description,
                pdf_key: pdf_key.clone(),
            })
            .await
        {
            Ok(document) => document,
            Err(e) => {
                // Cleanup the uploaded object on database failure
                let storage = self.storage.clone();
                tokio::spawn(async move {
                    if let Err(cleanup_err) = storage.delete(&pdf_key).await {
                        tracing::debug!(
                            error = %cleanup_err,
                            storage_key = %pdf_key,
                            "Failed to cleanup storage object after DB error"
                        );
                    }
                });
                return Err(HttpAppError(e));
            }
        };

        self.convert_document(&document).await
    }

    /// Convert a stored document and attach the derived HTML. Also used by
    /// the reconciler for rows left unconverted by earlier failures.
    pub async fn convert_document(&self, document: &Document) -> Result<Document, HttpAppError> {
        let _guard = InFlightGuard::acquire(&self.in_flight, document.id)?;

        let output = self.pipeline.convert(&document.pdf_key, document.id).await?;

        let mut urls: BTreeMap<String, String> = BTreeMap::new();
        for (name, data) in output.images {
            let key = keys::image_key(document.id, &name);
            let content_type = if name.ends_with(".jpg") {
                "image/jpeg"
            } else {
                "image/png"
            };
            // Any image failure fails the attach; no broken <img> references
            let url = self
                .storage
                .upload_with_key(&key, data, content_type)
                .await?;
            urls.insert(name, url);
        }

        let html = rewrite_image_sources(&output.html, &urls);

        let html_key = keys::html_key(document.id);
        self.storage
            .upload_with_key(&html_key, html.clone().into_bytes(), "text/html")
            .await?;

        let updated = self
            .documents
            .attach_html(document.id, &html_key, &html)
            .await?;

        tracing::info!(
            document_id = %updated.id,
            html_key = %html_key,
            image_count = urls.len(),
            "document converted and published"
        );

        Ok(updated)
    }
}

/// Marks a document conversion as in flight for the guard's lifetime.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<Uuid>>, id: Uuid) -> Result<Self, HttpAppError> {
        let mut guard = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !guard.insert(id) {
            return Err(HttpAppError(AppError::Conflict(
                "conversion already in progress for this document".to_string(),
            )));
        }
        Ok(InFlightGuard { set, id })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut guard = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remove(&self.id);
    }
}

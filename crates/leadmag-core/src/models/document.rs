use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A lead-magnet document: one uploaded PDF and, once conversion has
/// succeeded, its derived HTML artifact.
///
/// `html_key` and `html_content` are NULL at creation and set together,
/// exactly once, by a successful conversion attach. `owner_id` never changes
/// after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub pdf_key: String,
    pub html_key: Option<String>,
    pub html_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Whether a derived HTML artifact has been attached.
    pub fn is_converted(&self) -> bool {
        self.html_key.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub pdf_key: String,
    /// "converted" once the derived HTML is attached, "pending" otherwise.
    pub conversion: String,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        let conversion = if doc.is_converted() {
            "converted".to_string()
        } else {
            "pending".to_string()
        };
        DocumentResponse {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            pdf_key: doc.pdf_key,
            conversion,
            created_at: doc.created_at,
        }
    }
}

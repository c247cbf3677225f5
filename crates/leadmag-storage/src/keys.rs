//! Shared key generation for storage backends.
//!
//! Key layout: `pdfs/{timestamp}_{sanitized_filename}` for source PDFs,
//! `html/{document_id}.html` for derived HTML, and
//! `images/{document_id}/{filename}` for extracted images.

use uuid::Uuid;

/// Replace anything outside `[a-zA-Z0-9.-]` with `_` so uploaded filenames
/// cannot smuggle separators or traversal sequences into keys.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Generate the storage key for an uploaded source PDF.
///
/// The millisecond timestamp prefix keeps repeated uploads of the same
/// filename from colliding.
pub fn pdf_key(filename: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    format!("pdfs/{}_{}", timestamp, sanitize_filename(filename))
}

/// Generate the storage key for a document's derived HTML artifact.
pub fn html_key(document_id: Uuid) -> String {
    format!("html/{}.html", document_id)
}

/// Generate the storage key for an extracted image belonging to a document.
pub fn image_key(document_id: Uuid, filename: &str) -> String {
    format!("images/{}/{}", document_id, sanitize_filename(filename))
}

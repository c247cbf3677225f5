//! lopdf document plumbing
//!
//! Page enumeration, inherited page-tree attributes, and content-stream
//! collection. Everything here deals with PDF object structure; content
//! interpretation lives in `content.rs`.

use crate::pipeline::ConvertError;

/// A parsed PDF document with its ordered page ids.
pub struct PdfDocument {
    inner: lopdf::Document,
    page_ids: Vec<lopdf::ObjectId>,
}

impl PdfDocument {
    pub fn open(bytes: &[u8]) -> Result<Self, ConvertError> {
        let inner = lopdf::Document::load_mem(bytes)
            .map_err(|e| ConvertError::Malformed(format!("failed to parse PDF: {}", e)))?;

        // get_pages returns BTreeMap<u32, ObjectId> keyed by 1-based page number
        let page_ids: Vec<lopdf::ObjectId> = inner.get_pages().values().copied().collect();

        Ok(PdfDocument { inner, page_ids })
    }

    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn page_id(&self, index: usize) -> Option<lopdf::ObjectId> {
        self.page_ids.get(index).copied()
    }

    /// Decoded content stream bytes for a page, concatenated across
    /// `/Contents` arrays.
    pub fn page_content_bytes(&self, page_id: lopdf::ObjectId) -> Result<Vec<u8>, ConvertError> {
        let page_dict = self
            .inner
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| ConvertError::Malformed(format!("failed to get page dictionary: {}", e)))?;

        let contents_obj = match page_dict.get(b"Contents") {
            Ok(obj) => obj,
            Err(_) => return Ok(Vec::new()), // page with no content
        };

        match contents_obj {
            lopdf::Object::Reference(id) => {
                let stream = self.resolve_stream(*id)?;
                decode_content_stream(stream)
            }
            lopdf::Object::Array(arr) => {
                let mut content = Vec::new();
                for item in arr {
                    let id = item.as_reference().map_err(|e| {
                        ConvertError::Malformed(format!(
                            "/Contents array item is not a reference: {}",
                            e
                        ))
                    })?;
                    let stream = self.resolve_stream(id)?;
                    let bytes = decode_content_stream(stream)?;
                    if !content.is_empty() {
                        content.push(b' ');
                    }
                    content.extend_from_slice(&bytes);
                }
                Ok(content)
            }
            _ => Err(ConvertError::Malformed(
                "/Contents is not a reference or array".to_string(),
            )),
        }
    }

    /// Resources dictionary for a page, walking up the page tree if
    /// inherited. Missing resources degrade to an empty dictionary.
    pub fn page_resources(
        &self,
        page_id: lopdf::ObjectId,
    ) -> Result<&lopdf::Dictionary, ConvertError> {
        match self.resolve_inherited(page_id, b"Resources")? {
            Some(obj) => {
                let obj = match obj {
                    lopdf::Object::Reference(id) => self.inner.get_object(*id).map_err(|e| {
                        ConvertError::Malformed(format!(
                            "failed to resolve /Resources reference: {}",
                            e
                        ))
                    })?,
                    other => other,
                };
                obj.as_dict().map_err(|_| {
                    ConvertError::Malformed("/Resources is not a dictionary".to_string())
                })
            }
            None => {
                static EMPTY_DICT: std::sync::LazyLock<lopdf::Dictionary> =
                    std::sync::LazyLock::new(lopdf::Dictionary::new);
                Ok(&EMPTY_DICT)
            }
        }
    }

    fn resolve_stream(&self, id: lopdf::ObjectId) -> Result<&lopdf::Stream, ConvertError> {
        self.inner
            .get_object(id)
            .and_then(|o| o.as_stream())
            .map_err(|e| ConvertError::Malformed(format!("/Contents is not a stream: {}", e)))
    }

    /// Look up a key on the page dictionary, walking up via /Parent when the
    /// key is not on the page itself. The walk is depth-capped so a cyclic
    /// /Parent chain terminates instead of spinning on the blocking pool.
    fn resolve_inherited(
        &self,
        page_id: lopdf::ObjectId,
        key: &[u8],
    ) -> Result<Option<&lopdf::Object>, ConvertError> {
        const MAX_PARENT_DEPTH: usize = 64;

        let mut current_id = page_id;
        for _ in 0..MAX_PARENT_DEPTH {
            let dict = self
                .inner
                .get_object(current_id)
                .and_then(|o| o.as_dict())
                .map_err(|e| {
                    ConvertError::Malformed(format!("failed to get page dictionary: {}", e))
                })?;

            if let Ok(value) = dict.get(key) {
                return Ok(Some(value));
            }

            match dict.get(b"Parent") {
                Ok(parent_obj) => {
                    current_id = parent_obj.as_reference().map_err(|e| {
                        ConvertError::Malformed(format!("invalid /Parent reference: {}", e))
                    })?;
                }
                Err(_) => return Ok(None),
            }
        }
        Err(ConvertError::Malformed(
            "/Parent chain exceeds maximum page-tree depth".to_string(),
        ))
    }
}

/// Decode a content stream, decompressing if needed.
fn decode_content_stream(stream: &lopdf::Stream) -> Result<Vec<u8>, ConvertError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| ConvertError::Malformed(format!("failed to decompress content: {}", e)))
    } else {
        Ok(stream.content.clone())
    }
}

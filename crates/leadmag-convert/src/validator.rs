use std::path::Path;

/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: pdf)")]
    InvalidExtension { extension: String },

    #[error("Invalid content type: {content_type} (allowed: application/pdf)")]
    InvalidContentType { content_type: String },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("File is not a PDF (bad magic bytes)")]
    NotAPdf,

    #[error("Empty file")]
    EmptyFile,
}

const PDF_MAGIC: &[u8] = b"%PDF";

/// Upload validator for source PDFs
///
/// Checks run before any storage write: extension, declared content type,
/// magic bytes, and size. Declared content type alone is not trusted.
pub struct FileValidator {
    max_file_size: usize,
}

impl FileValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if extension != "pdf" {
            return Err(ValidationError::InvalidExtension { extension });
        }

        Ok(())
    }

    /// Validate declared content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if content_type.to_lowercase() != "application/pdf" {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    /// Validate magic bytes. Prevents content-type spoofing where a
    /// non-PDF payload is uploaded with a legitimate declared type.
    pub fn validate_magic_bytes(&self, data: &[u8]) -> Result<(), ValidationError> {
        if data.len() < PDF_MAGIC.len() || &data[..PDF_MAGIC.len()] != PDF_MAGIC {
            return Err(ValidationError::NotAPdf);
        }
        Ok(())
    }

    /// Run all checks in order: extension, content type, size, magic bytes.
    pub fn validate(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<(), ValidationError> {
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        self.validate_file_size(data.len())?;
        self.validate_magic_bytes(data)?;
        Ok(())
    }
}

//! Leadmag Storage Library
//!
//! Storage abstraction and implementations for the lead-magnet service.
//! Includes the Storage trait with S3, local filesystem, and in-memory
//! backends.
//!
//! # Storage key format
//!
//! All backends share the same key layout:
//!
//! - **Source PDFs**: `pdfs/{timestamp}_{sanitized_filename}`
//! - **Derived HTML**: `html/{document_id}.html`
//! - **Extracted images**: `images/{document_id}/{filename}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use leadmag_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};

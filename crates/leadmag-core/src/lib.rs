//! Leadmag Core Library
//!
//! Core domain models, error types, and configuration shared across all
//! leadmag components.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{AuthUser, Document, DocumentResponse, Lead, LeadResponse, NewLead};
pub use storage_types::StorageBackend;

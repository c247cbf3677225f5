//! Leadmag Database Library
//!
//! Repositories for the data access layer. The `DocumentStore` and
//! `LeadStore` traits are the seams the API and background tasks depend on;
//! `PgDocumentRepository` and `PgLeadRepository` are the Postgres
//! implementations, and `test_helpers` provides in-memory substitutes.

pub mod documents;
pub mod leads;
pub mod test_helpers;

pub use documents::{DocumentStore, NewDocument, PgDocumentRepository};
pub use leads::{LeadStore, PgLeadRepository};
pub use test_helpers::{InMemoryDocumentStore, InMemoryLeadStore};

pub mod document;
pub mod lead;
pub mod user;

pub use document::{Document, DocumentResponse};
pub use lead::{Lead, LeadResponse, NewLead};
pub use user::AuthUser;

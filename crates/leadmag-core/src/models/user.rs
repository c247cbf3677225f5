use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated caller, produced by the auth middleware from verified JWT
/// claims and injected as a request extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A captured lead: the name/email an end-user submitted to unlock a
/// published document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Lead {
    pub id: Uuid,
    pub document_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Lead-capture payload from the public view page.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewLead {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeadResponse {
    pub id: Uuid,
    pub document_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        LeadResponse {
            id: lead.id,
            document_id: lead.document_id,
            name: lead.name,
            email: lead.email,
            created_at: lead.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lead_valid() {
        let lead = NewLead {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        };
        assert!(lead.validate().is_ok());
    }

    #[test]
    fn test_new_lead_rejects_empty_name() {
        let lead = NewLead {
            name: "".to_string(),
            email: "ada@example.com".to_string(),
        };
        assert!(lead.validate().is_err());
    }

    #[test]
    fn test_new_lead_rejects_bad_email() {
        let lead = NewLead {
            name: "Ada".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(lead.validate().is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hospital branch (department). Doctors are attached to exactly one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Branch {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBranchRequest {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BranchError {
    #[error("Branch not found")]
    NotFound,

    #[error("A branch named '{0}' already exists")]
    NameTaken(String),

    #[error("Database error: {0}")]
    Database(String),
}

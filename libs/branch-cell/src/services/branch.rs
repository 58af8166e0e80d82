use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, RecordScope, SupabaseClient};

use crate::models::{Branch, BranchError, CreateBranchRequest, UpdateBranchRequest};

const TABLE: &str = "branches";

pub struct BranchService {
    supabase: SupabaseClient,
}

impl BranchService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_branch(
        &self,
        request: CreateBranchRequest,
        auth_token: &str,
    ) -> Result<Branch, BranchError> {
        debug!("Creating branch '{}'", request.name);

        if self
            .find_by_name(&request.name, RecordScope::Active, Some(auth_token))
            .await?
            .is_some()
        {
            return Err(BranchError::NameTaken(request.name));
        }

        let row = json!({
            "name": &request.name,
            "created_at": Utc::now().to_rfc3339(),
        });

        let branch: Branch = self
            .supabase
            .insert_returning(TABLE, row, Some(auth_token))
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => BranchError::NameTaken(request.name.clone()),
                other => BranchError::Database(other.to_string()),
            })?;

        info!("Branch '{}' created with id {}", branch.name, branch.id);
        Ok(branch)
    }

    pub async fn update_branch(
        &self,
        branch_id: Uuid,
        request: UpdateBranchRequest,
        auth_token: &str,
    ) -> Result<Branch, BranchError> {
        debug!("Updating branch {}", branch_id);

        self.get_branch(branch_id, Some(auth_token)).await?;

        // Another active branch may not already hold the requested name.
        let name_filter = format!(
            "name=eq.{}&id=neq.{}",
            urlencoding::encode(&request.name),
            branch_id
        );
        let clash: Option<Branch> = self
            .supabase
            .fetch_optional(TABLE, &RecordScope::Active.apply(&name_filter), Some(auth_token))
            .await
            .map_err(|e| BranchError::Database(e.to_string()))?;

        if clash.is_some() {
            return Err(BranchError::NameTaken(request.name));
        }

        let patch = json!({
            "name": &request.name,
            "updated_at": Utc::now().to_rfc3339(),
        });

        self.supabase
            .update_returning(TABLE, &format!("id=eq.{}", branch_id), patch, Some(auth_token))
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => BranchError::NameTaken(request.name.clone()),
                DatabaseError::NotFound(_) => BranchError::NotFound,
                other => BranchError::Database(other.to_string()),
            })
    }

    /// Soft-delete: the row stays behind with its delete marker set.
    pub async fn delete_branch(&self, branch_id: Uuid, auth_token: &str) -> Result<Branch, BranchError> {
        debug!("Soft-deleting branch {}", branch_id);

        self.get_branch(branch_id, Some(auth_token)).await?;

        let patch = json!({ "deleted_at": Utc::now().to_rfc3339() });

        self.supabase
            .update_returning(TABLE, &format!("id=eq.{}", branch_id), patch, Some(auth_token))
            .await
            .map_err(|e| BranchError::Database(e.to_string()))
    }

    pub async fn get_branch(
        &self,
        branch_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Branch, BranchError> {
        let filter = RecordScope::Active.apply(&format!("id=eq.{}", branch_id));
        self.supabase
            .fetch_optional(TABLE, &filter, auth_token)
            .await
            .map_err(|e| BranchError::Database(e.to_string()))?
            .ok_or(BranchError::NotFound)
    }

    pub async fn get_branch_by_name(
        &self,
        name: &str,
        auth_token: Option<&str>,
    ) -> Result<Branch, BranchError> {
        self.find_by_name(name, RecordScope::Active, auth_token)
            .await?
            .ok_or(BranchError::NotFound)
    }

    pub async fn list_branches(
        &self,
        limit: Option<i32>,
        offset: Option<i32>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Branch>, BranchError> {
        let mut filters = RecordScope::Active.apply("order=name.asc");

        if let Some(limit) = limit {
            filters.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = offset {
            filters.push_str(&format!("&offset={}", offset));
        }

        self.supabase
            .fetch_all(TABLE, &filters, auth_token)
            .await
            .map_err(|e| BranchError::Database(e.to_string()))
    }

    async fn find_by_name(
        &self,
        name: &str,
        scope: RecordScope,
        auth_token: Option<&str>,
    ) -> Result<Option<Branch>, BranchError> {
        let filter = scope.apply(&format!("name=eq.{}", urlencoding::encode(name)));
        self.supabase
            .fetch_optional(TABLE, &filter, auth_token)
            .await
            .map_err(|e| BranchError::Database(e.to_string()))
    }
}

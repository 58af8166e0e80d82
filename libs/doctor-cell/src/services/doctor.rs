use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use branch_cell::models::BranchError;
use branch_cell::services::branch::BranchService;
use shared_config::AppConfig;
use shared_database::{RecordScope, SupabaseClient};

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorError, DoctorWithBranch, UpdateDoctorRequest,
};

const TABLE: &str = "doctors";

pub struct DoctorService {
    supabase: SupabaseClient,
    branch_service: BranchService,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            branch_service: BranchService::new(config),
        }
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!(
            "Creating doctor {} {} in branch {}",
            request.first_name, request.last_name, request.branch_id
        );

        self.branch_service
            .get_branch(request.branch_id, Some(auth_token))
            .await
            .map_err(|e| match e {
                BranchError::NotFound => DoctorError::BranchNotFound,
                other => DoctorError::Database(other.to_string()),
            })?;

        let row = json!({
            "title": request.title,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "branch_id": request.branch_id,
            "created_at": Utc::now().to_rfc3339(),
        });

        let doctor: Doctor = self
            .supabase
            .insert_returning(TABLE, row, Some(auth_token))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        info!("Doctor {} created with id {}", doctor.display_name(), doctor.id);
        Ok(doctor)
    }

    /// Fetch a doctor with the branch aggregate attached.
    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<DoctorWithBranch, DoctorError> {
        let doctor = self.fetch_active(doctor_id, auth_token).await?;

        let branch = match self
            .branch_service
            .get_branch(doctor.branch_id, auth_token)
            .await
        {
            Ok(branch) => Some(branch),
            Err(BranchError::NotFound) => None,
            Err(other) => return Err(DoctorError::Database(other.to_string())),
        };

        Ok(DoctorWithBranch { doctor, branch })
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor {}", doctor_id);

        self.fetch_active(doctor_id, Some(auth_token)).await?;

        let mut patch = serde_json::Map::new();

        if let Some(title) = request.title {
            patch.insert("title".to_string(), json!(title));
        }
        if let Some(first_name) = request.first_name {
            patch.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            patch.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(branch_id) = request.branch_id {
            self.branch_service
                .get_branch(branch_id, Some(auth_token))
                .await
                .map_err(|e| match e {
                    BranchError::NotFound => DoctorError::BranchNotFound,
                    other => DoctorError::Database(other.to_string()),
                })?;
            patch.insert("branch_id".to_string(), json!(branch_id));
        }

        patch.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        self.supabase
            .update_returning(
                TABLE,
                &format!("id=eq.{}", doctor_id),
                serde_json::Value::Object(patch),
                Some(auth_token),
            )
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))
    }

    /// Soft-delete a doctor.
    pub async fn delete_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Soft-deleting doctor {}", doctor_id);

        self.fetch_active(doctor_id, Some(auth_token)).await?;

        let patch = json!({ "deleted_at": Utc::now().to_rfc3339() });

        self.supabase
            .update_returning(TABLE, &format!("id=eq.{}", doctor_id), patch, Some(auth_token))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))
    }

    pub async fn list_doctors(
        &self,
        branch_id: Option<Uuid>,
        limit: Option<i32>,
        offset: Option<i32>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Doctor>, DoctorError> {
        let mut filters = String::from("order=last_name.asc");

        if let Some(branch_id) = branch_id {
            filters.push_str(&format!("&branch_id=eq.{}", branch_id));
        }
        if let Some(limit) = limit {
            filters.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = offset {
            filters.push_str(&format!("&offset={}", offset));
        }

        self.supabase
            .fetch_all(TABLE, &RecordScope::Active.apply(&filters), auth_token)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))
    }

    async fn fetch_active(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        let filter = RecordScope::Active.apply(&format!("id=eq.{}", doctor_id));
        self.supabase
            .fetch_optional(TABLE, &filter, auth_token)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?
            .ok_or(DoctorError::NotFound)
    }
}

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, RecordScope, SupabaseClient};

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};
use crate::services::identity::IdentityCipher;

const TABLE: &str = "patients";

pub struct PatientService {
    supabase: SupabaseClient,
    cipher: IdentityCipher,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Result<Self, PatientError> {
        Ok(Self {
            supabase: SupabaseClient::new(config),
            cipher: IdentityCipher::from_config(config)?,
        })
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient profile for {}", request.email);

        let email_filter = RecordScope::Active.apply(&format!(
            "email=eq.{}",
            urlencoding::encode(&request.email)
        ));
        let existing: Option<Patient> = self
            .supabase
            .fetch_optional(TABLE, &email_filter, Some(auth_token))
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;
        if existing.is_some() {
            return Err(PatientError::EmailTaken(request.email));
        }

        let identity_hash = IdentityCipher::fingerprint(&request.national_identity);
        let identity_filter = RecordScope::Active.apply(&format!(
            "national_identity_hash=eq.{}",
            identity_hash
        ));
        let clash: Option<Patient> = self
            .supabase
            .fetch_optional(TABLE, &identity_filter, Some(auth_token))
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;
        if clash.is_some() {
            return Err(PatientError::IdentityTaken);
        }

        let encrypted_identity = self.cipher.encrypt(&request.national_identity)?;

        let row = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "phone_number": request.phone_number,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "national_identity": encrypted_identity,
            "national_identity_hash": identity_hash,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut patient: Patient = self
            .supabase
            .insert_returning(TABLE, row, Some(auth_token))
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => PatientError::IdentityTaken,
                other => PatientError::Database(other.to_string()),
            })?;

        // Hand the caller back the plaintext it sent, not the stored blob.
        patient.national_identity = request.national_identity;

        info!("Patient profile created with id {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile {}", patient_id);

        let mut patient = self.fetch_active(patient_id, auth_token).await?;
        patient.national_identity = self.cipher.decrypt(&patient.national_identity)?;
        Ok(patient)
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient profile {}", patient_id);

        self.fetch_active(patient_id, auth_token).await?;

        let mut patch = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            patch.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            patch.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(phone_number) = request.phone_number {
            patch.insert("phone_number".to_string(), json!(phone_number));
        }

        if let Some(email) = request.email {
            let email_filter = RecordScope::Active.apply(&format!(
                "email=eq.{}&id=neq.{}",
                urlencoding::encode(&email),
                patient_id
            ));
            let clash: Option<Patient> = self
                .supabase
                .fetch_optional(TABLE, &email_filter, Some(auth_token))
                .await
                .map_err(|e| PatientError::Database(e.to_string()))?;
            if clash.is_some() {
                return Err(PatientError::EmailTaken(email));
            }
            patch.insert("email".to_string(), json!(email));
        }

        let returned_identity = if let Some(identity) = request.national_identity {
            let identity_hash = IdentityCipher::fingerprint(&identity);
            let identity_filter = RecordScope::Active.apply(&format!(
                "national_identity_hash=eq.{}&id=neq.{}",
                identity_hash, patient_id
            ));
            let clash: Option<Patient> = self
                .supabase
                .fetch_optional(TABLE, &identity_filter, Some(auth_token))
                .await
                .map_err(|e| PatientError::Database(e.to_string()))?;
            if clash.is_some() {
                return Err(PatientError::IdentityTaken);
            }

            patch.insert(
                "national_identity".to_string(),
                json!(self.cipher.encrypt(&identity)?),
            );
            patch.insert("national_identity_hash".to_string(), json!(identity_hash));
            Some(identity)
        } else {
            None
        };

        patch.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut patient: Patient = self
            .supabase
            .update_returning(
                TABLE,
                &format!("id=eq.{}", patient_id),
                serde_json::Value::Object(patch),
                Some(auth_token),
            )
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => PatientError::NotFound,
                DatabaseError::UniqueViolation(_) => PatientError::IdentityTaken,
                other => PatientError::Database(other.to_string()),
            })?;

        patient.national_identity = match returned_identity {
            Some(identity) => identity,
            None => self.cipher.decrypt(&patient.national_identity)?,
        };

        Ok(patient)
    }

    /// Soft-delete the profile; the row stays eligible for audit reads.
    pub async fn delete_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Soft-deleting patient profile {}", patient_id);

        self.fetch_active(patient_id, auth_token).await?;

        let patch = json!({ "deleted_at": Utc::now().to_rfc3339() });

        self.supabase
            .update_returning(TABLE, &format!("id=eq.{}", patient_id), patch, Some(auth_token))
            .await
            .map_err(|e| PatientError::Database(e.to_string()))
    }

    pub async fn list_patients(
        &self,
        limit: Option<i32>,
        offset: Option<i32>,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        let mut filters = RecordScope::Active.apply("order=last_name.asc");

        if let Some(limit) = limit {
            filters.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = offset {
            filters.push_str(&format!("&offset={}", offset));
        }

        let mut patients: Vec<Patient> = self
            .supabase
            .fetch_all(TABLE, &filters, Some(auth_token))
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        for patient in &mut patients {
            patient.national_identity = self.cipher.decrypt(&patient.national_identity)?;
        }

        Ok(patients)
    }

    async fn fetch_active(&self, patient_id: Uuid, auth_token: &str) -> Result<Patient, PatientError> {
        let filter = RecordScope::Active.apply(&format!("id=eq.{}", patient_id));
        self.supabase
            .fetch_optional(TABLE, &filter, Some(auth_token))
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?
            .ok_or(PatientError::NotFound)
    }
}

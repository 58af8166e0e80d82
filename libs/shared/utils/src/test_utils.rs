use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub mail_api_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            mail_api_url: "http://localhost:54400".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointing the data layer at a mock PostgREST server.
    pub fn with_database_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            mail_api_url: self.mail_api_url.clone(),
            mail_api_key: "test-mail-key".to_string(),
            mail_from_address: "appointments@hospital.test".to_string(),
            mail_from_name: "Hospital Appointments".to_string(),
            identity_encryption_key: general_purpose::STANDARD.encode([7u8; 32]),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row builders for mocking PostgREST responses in cell tests.
pub struct MockTableRows;

impl MockTableRows {
    pub fn branch(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "deleted_at": null
        })
    }

    pub fn doctor(id: &str, branch_id: &str, first_name: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Dr.",
            "first_name": first_name,
            "last_name": last_name,
            "branch_id": branch_id,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "deleted_at": null
        })
    }

    pub fn patient(id: &str, email: &str, first_name: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "first_name": first_name,
            "last_name": last_name,
            "email": email,
            "phone_number": null,
            "date_of_birth": "1990-01-01",
            "national_identity": "encrypted-identity-blob",
            "national_identity_hash": "0f1e2d3c4b5a",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "deleted_at": null
        })
    }

    pub fn schedule(id: &str, doctor_id: &str, date: &str) -> serde_json::Value {
        json!({
            "id": id,
            "doctor_id": doctor_id,
            "date": date,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "deleted_at": null
        })
    }

    pub fn deleted_schedule(id: &str, doctor_id: &str, date: &str, deleted_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "doctor_id": doctor_id,
            "date": date,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "deleted_at": deleted_at
        })
    }

    pub fn appointment(id: &str, patient_id: &str, doctor_id: &str, date: &str, time: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "time": time,
            "status": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "deleted_at": null
        })
    }

    pub fn deleted_appointment(
        id: &str,
        patient_id: &str,
        doctor_id: &str,
        date: &str,
        deleted_at: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "time": "10:00:00",
            "status": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "deleted_at": deleted_at
        })
    }

    pub fn report(id: &str, appointment_id: &str, text: &str) -> serde_json::Value {
        json!({
            "id": id,
            "appointment_id": appointment_id,
            "text": text,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "deleted_at": null
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(app_config.is_identity_encryption_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_jwt_round_trip() {
        let user = TestUser::patient("round@example.com");
        let secret = "another-test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        let validated = crate::jwt::validate_token(&token, secret).expect("token should validate");
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.role, Some("patient".to_string()));

        assert!(crate::jwt::validate_token(&token, "wrong-secret").is_err());
        let expired = JwtTestUtils::create_expired_token(&user, secret);
        assert!(crate::jwt::validate_token(&expired, secret).is_err());
    }
}

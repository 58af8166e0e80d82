use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, PatientError, UpdatePatientRequest};
use crate::services::patient::PatientService;

#[derive(Debug, Deserialize)]
pub struct PatientListQuery {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::EmailTaken(email) => {
            AppError::Conflict(format!("A patient with email {} already exists", email))
        }
        PatientError::IdentityTaken => {
            AppError::Conflict("A patient with this identity number already exists".to_string())
        }
        PatientError::Identity(msg) => AppError::Internal(msg),
        PatientError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to create patient profiles".to_string()));
    }

    let patient_service = PatientService::new(&state).map_err(map_patient_error)?;

    let patient = patient_service
        .create_patient(request, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let is_self = patient_id.to_string() == user.id;
    if !is_self && !user.is_staff() {
        return Err(AppError::Auth("Not authorized to view this patient".to_string()));
    }

    let patient_service = PatientService::new(&state).map_err(map_patient_error)?;

    let patient = patient_service
        .get_patient(patient_id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = patient_id.to_string() == user.id;
    if !is_self && !user.is_staff() {
        return Err(AppError::Auth("Not authorized to update this patient".to_string()));
    }

    let patient_service = PatientService::new(&state).map_err(map_patient_error)?;

    let patient = patient_service
        .update_patient(patient_id, request, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can delete patient profiles".to_string()));
    }

    let patient_service = PatientService::new(&state).map_err(map_patient_error)?;

    let patient = patient_service
        .delete_patient(patient_id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient profile deleted"
    })))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<PatientListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to list patients".to_string()));
    }

    let patient_service = PatientService::new(&state).map_err(map_patient_error)?;

    let patients = patient_service
        .list_patients(query.limit, query.offset, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

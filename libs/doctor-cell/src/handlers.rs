use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateDoctorRequest, CreateScheduleRequest, DoctorError, ScheduleError,
    UpdateDoctorRequest, UpdateScheduleRequest,
};
use crate::services::{doctor::DoctorService, schedule::ScheduleService};

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub branch_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// Schedule fields as they arrive on the wire; the doctor id comes from the path.
#[derive(Debug, Deserialize)]
pub struct SchedulePayload {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

fn map_schedule_error(e: ScheduleError) -> AppError {
    match e {
        ScheduleError::NotFound => {
            AppError::NotFound("No such record in the doctor's schedule".to_string())
        }
        ScheduleError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        ScheduleError::DateTaken => {
            AppError::Conflict("A schedule already exists for this doctor on this date".to_string())
        }
        ScheduleError::BookingsExist => AppError::Conflict(
            "Patients already hold bookings for this date; the date cannot be changed".to_string(),
        ),
        ScheduleError::InvalidTimeRange => {
            AppError::BadRequest("Start time must be before end time".to_string())
        }
        ScheduleError::Database(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC DOCTOR HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service
        .list_doctors(query.branch_id, query.limit, query.offset, None)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .get_doctor(doctor_id, None)
        .await
        .map_err(|e| match e {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!(doctor)))
}

// ==============================================================================
// PROTECTED DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can manage doctors".to_string()));
    }

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .create_doctor(request, auth.token())
        .await
        .map_err(|e| match e {
            DoctorError::BranchNotFound => AppError::NotFound("Branch not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can manage doctors".to_string()));
    }

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .update_doctor(doctor_id, request, auth.token())
        .await
        .map_err(|e| match e {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::BranchNotFound => AppError::NotFound("Branch not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can manage doctors".to_string()));
    }

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .delete_doctor(doctor_id, auth.token())
        .await
        .map_err(|e| match e {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Doctor deleted"
    })))
}

// ==============================================================================
// SCHEDULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let schedules = schedule_service
        .list_schedules(doctor_id, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "schedules": schedules,
        "total": schedules.len()
    })))
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(payload): Json<SchedulePayload>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to manage schedules".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    let request = CreateScheduleRequest {
        doctor_id,
        date: payload.date,
        start_time: payload.start_time,
        end_time: payload.end_time,
    };

    let schedule = schedule_service
        .create_schedule(request, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, schedule_id)): Path<(Uuid, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(payload): Json<SchedulePayload>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to manage schedules".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    let request = UpdateScheduleRequest {
        doctor_id,
        date: payload.date,
        start_time: payload.start_time,
        end_time: payload.end_time,
    };

    let schedule = schedule_service
        .update_schedule(schedule_id, request, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<Arc<AppConfig>>,
    Path((_doctor_id, schedule_id)): Path<(Uuid, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to manage schedules".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    let schedule = schedule_service
        .delete_schedule(schedule_id, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule,
        "message": "Schedule deleted"
    })))
}

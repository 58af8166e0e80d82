use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AppointmentSearchQuery, BookingError, CreateAppointmentRequest};
use crate::services::booking::BookingService;

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        BookingError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        BookingError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        BookingError::BranchNotFound => AppError::NotFound("Branch not found".to_string()),
        BookingError::OutsideScheduleHours => AppError::Conflict(
            "The requested time falls outside the doctor's working hours".to_string(),
        ),
        BookingError::AlreadyBooked => AppError::Conflict(
            "Patient already has an appointment with this doctor on this date".to_string(),
        ),
        BookingError::StorageConflict => {
            AppError::Conflict("A concurrent booking took this slot".to_string())
        }
        BookingError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Patients book for themselves; staff can book on a patient's behalf.
    let is_patient_self = request.patient_id.to_string() == user.id;
    if !is_patient_self && !user.is_staff() {
        return Err(AppError::Auth(
            "Not authorized to book an appointment for this patient".to_string(),
        ));
    }

    let booking_service = BookingService::new(&state).map_err(map_booking_error)?;

    let details = booking_service
        .create_appointment(request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": details,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state).map_err(map_booking_error)?;

    let details = booking_service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    let is_participant = details.appointment.patient_id.to_string() == user.id
        || details.appointment.doctor_id.to_string() == user.id;
    if !is_participant && !user.is_staff() {
        return Err(AppError::Auth("Not authorized to view this appointment".to_string()));
    }

    Ok(Json(json!(details)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state).map_err(map_booking_error)?;

    // Fetch first so ownership can be checked before mutating anything.
    let details = booking_service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    let is_participant = details.appointment.patient_id.to_string() == user.id
        || details.appointment.doctor_id.to_string() == user.id;
    if !is_participant && !user.is_staff() {
        return Err(AppError::Auth("Not authorized to cancel this appointment".to_string()));
    }

    let cancelled = booking_service
        .cancel_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": cancelled,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(mut query): Query<AppointmentSearchQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    // Non-staff callers only see their own bookings.
    if !user.is_staff() {
        let own_id = user
            .id
            .parse::<Uuid>()
            .map_err(|_| AppError::Auth("Invalid user id".to_string()))?;
        query.patient_id = Some(own_id);
    }

    let booking_service = BookingService::new(&state).map_err(map_booking_error)?;

    let appointments = booking_service
        .search_appointments(query, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

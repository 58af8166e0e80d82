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

use crate::models::{CreateReportRequest, ReportError, UpdateReportRequest};
use crate::services::report::ReportService;

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn map_report_error(e: ReportError) -> AppError {
    match e {
        ReportError::NotFound => AppError::NotFound("Report not found".to_string()),
        ReportError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        ReportError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        ReportError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        ReportError::Identity(msg) => AppError::Internal(msg),
        ReportError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReportRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to write reports".to_string()));
    }

    let report_service = ReportService::new(&state).map_err(map_report_error)?;

    let report = report_service
        .create_report(request, auth.token())
        .await
        .map_err(map_report_error)?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

#[axum::debug_handler]
pub async fn update_report(
    State(state): State<Arc<AppConfig>>,
    Path(report_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateReportRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to edit reports".to_string()));
    }

    let report_service = ReportService::new(&state).map_err(map_report_error)?;

    let report = report_service
        .update_report(report_id, request, auth.token())
        .await
        .map_err(map_report_error)?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

#[axum::debug_handler]
pub async fn delete_report(
    State(state): State<Arc<AppConfig>>,
    Path(report_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to delete reports".to_string()));
    }

    let report_service = ReportService::new(&state).map_err(map_report_error)?;

    let report = report_service
        .delete_report(report_id, auth.token())
        .await
        .map_err(map_report_error)?;

    Ok(Json(json!({
        "success": true,
        "report": report,
        "message": "Report deleted"
    })))
}

#[axum::debug_handler]
pub async fn get_report(
    State(state): State<Arc<AppConfig>>,
    Path(report_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let report_service = ReportService::new(&state).map_err(map_report_error)?;

    let details = report_service
        .get_report(report_id, auth.token())
        .await
        .map_err(map_report_error)?;

    let is_participant = details.patient_id.to_string() == user.id
        || details.doctor_id.to_string() == user.id;
    if !is_participant && !user.is_staff() {
        return Err(AppError::Auth("Not authorized to view this report".to_string()));
    }

    Ok(Json(json!(details)))
}

#[axum::debug_handler]
pub async fn list_reports(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ReportListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Auth("Not authorized to list reports".to_string()));
    }

    let report_service = ReportService::new(&state).map_err(map_report_error)?;

    let reports = report_service
        .list_reports(query.limit, query.offset, auth.token())
        .await
        .map_err(map_report_error)?;

    Ok(Json(json!({
        "reports": reports,
        "total": reports.len()
    })))
}

#[axum::debug_handler]
pub async fn list_reports_by_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let is_doctor_self = doctor_id.to_string() == user.id;
    if !is_doctor_self && !user.is_staff() {
        return Err(AppError::Auth("Not authorized to view these reports".to_string()));
    }

    let report_service = ReportService::new(&state).map_err(map_report_error)?;

    let reports = report_service
        .list_reports_by_doctor(doctor_id, auth.token())
        .await
        .map_err(map_report_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "reports": reports,
        "total": reports.len()
    })))
}

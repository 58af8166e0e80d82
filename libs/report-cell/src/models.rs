use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A consultation report written against an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Report read model with the appointment, doctor, and patient details a
/// rendered report needs, resolved at read time.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDetails {
    pub id: Uuid,
    pub text: String,
    pub report_date: DateTime<Utc>,
    pub appointment_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub doctor_id: Uuid,
    pub doctor_title: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
    pub patient_id: Uuid,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_identity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReportRequest {
    pub appointment_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReportRequest {
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Report not found")]
    NotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Identity protection error: {0}")]
    Identity(String),

    #[error("Database error: {0}")]
    Database(String),
}

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use branch_cell::models::Branch;
use doctor_cell::models::Doctor;
use patient_cell::models::Patient;

/// A booking of a patient with a doctor on a date.
///
/// At most one *active* row may exist per `(patient_id, doctor_id, date)`;
/// a cancelled booking is soft-deleted and revived if the same triple books
/// again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// An appointment with its aggregates attached at read time.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor: Doctor,
    pub patient: Patient,
    pub branch: Branch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: bool,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Branch not found")]
    BranchNotFound,

    #[error("The requested time falls outside the doctor's working hours")]
    OutsideScheduleHours,

    #[error("Patient already has an appointment with this doctor on this date")]
    AlreadyBooked,

    /// The store's unique constraint fired on write. Distinct from the
    /// `AlreadyBooked` pre-check so a lost check-then-act race is visible
    /// as such.
    #[error("A concurrent booking took this slot")]
    StorageConflict,

    #[error("Database error: {0}")]
    Database(String),
}

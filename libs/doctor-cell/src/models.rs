use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use branch_cell::models::Branch;

// ==============================================================================
// DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub branch_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Doctor {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn display_name(&self) -> String {
        format!("{} {} {}", self.title, self.first_name, self.last_name)
    }
}

/// Doctor with its branch attached at read time.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorWithBranch {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub branch: Option<Branch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub branch_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Branch not found")]
    BranchNotFound,

    #[error("Database error: {0}")]
    Database(String),
}

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

/// A doctor's working-hours record for a single date.
///
/// At most one *active* row may exist per `(doctor_id, date)`; superseded rows
/// are soft-deleted and stay behind as revivable slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DoctorSchedule {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn covers(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("No such record in the doctor's schedule")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("A schedule already exists for this doctor on this date")]
    DateTaken,

    #[error("Patients already hold bookings for this date; the date cannot be changed")]
    BookingsExist,

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("Database error: {0}")]
    Database(String),
}

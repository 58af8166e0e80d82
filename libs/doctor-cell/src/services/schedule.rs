use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{RecordScope, SupabaseClient};

use crate::models::{
    CreateScheduleRequest, DoctorSchedule, ScheduleError, UpdateScheduleRequest,
};

const SCHEDULES: &str = "doctor_schedules";
const APPOINTMENTS: &str = "appointments";
const DOCTORS: &str = "doctors";

pub struct ScheduleService {
    supabase: SupabaseClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Create a working-hours record for a doctor on a date.
    ///
    /// A soft-deleted row for the same `(doctor_id, date)` is revived instead
    /// of inserting a second row, keeping the one-active-row-per-day invariant
    /// without burning the audit trail.
    pub async fn create_schedule(
        &self,
        request: CreateScheduleRequest,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        debug!(
            "Creating schedule for doctor {} on {}",
            request.doctor_id, request.date
        );

        if request.start_time >= request.end_time {
            return Err(ScheduleError::InvalidTimeRange);
        }

        self.ensure_doctor_exists(request.doctor_id, auth_token).await?;

        let existing = self
            .find_for_day(request.doctor_id, request.date, RecordScope::Any, auth_token)
            .await?;

        match existing {
            Some(schedule) if schedule.is_active() => Err(ScheduleError::DateTaken),
            Some(schedule) => {
                debug!("Reviving soft-deleted schedule {} for the new record", schedule.id);
                self.revive(schedule.id, &request, auth_token).await
            }
            None => {
                let row = json!({
                    "doctor_id": request.doctor_id,
                    "date": request.date.format("%Y-%m-%d").to_string(),
                    "start_time": request.start_time.format("%H:%M:%S").to_string(),
                    "end_time": request.end_time.format("%H:%M:%S").to_string(),
                    "created_at": Utc::now().to_rfc3339(),
                });

                let schedule: DoctorSchedule = self
                    .supabase
                    .insert_returning(SCHEDULES, row, Some(auth_token))
                    .await
                    .map_err(|e| ScheduleError::Database(e.to_string()))?;

                info!("Schedule {} created for doctor {}", schedule.id, schedule.doctor_id);
                Ok(schedule)
            }
        }
    }

    /// Reconcile a schedule change against conflicting rows and existing
    /// bookings.
    ///
    /// Booked appointments on the target date always win: a schedule may not
    /// be moved onto a date patients already hold bookings for. After that
    /// gate, an active row on the new `(doctor_id, date)` rejects the change,
    /// a soft-deleted one is revived (and the original target retired), and
    /// otherwise the target row is updated in place.
    pub async fn update_schedule(
        &self,
        schedule_id: Uuid,
        request: UpdateScheduleRequest,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        debug!(
            "Updating schedule {} -> doctor {} on {}",
            schedule_id, request.doctor_id, request.date
        );

        if request.start_time >= request.end_time {
            return Err(ScheduleError::InvalidTimeRange);
        }

        let target = self
            .find_by_id(schedule_id, RecordScope::Active, auth_token)
            .await?
            .ok_or(ScheduleError::NotFound)?;

        // Any row on the requested day counts as a conflict candidate,
        // soft-deleted ones included.
        let conflicting = self
            .find_for_day(request.doctor_id, request.date, RecordScope::Any, auth_token)
            .await?;

        if self
            .has_active_appointment(request.doctor_id, request.date, auth_token)
            .await?
        {
            warn!(
                "Schedule {} not moved to {}: patients already hold bookings",
                schedule_id, request.date
            );
            return Err(ScheduleError::BookingsExist);
        }

        match conflicting {
            Some(other) if other.id != target.id && other.is_active() => {
                Err(ScheduleError::DateTaken)
            }
            Some(other) if other.id != target.id => {
                let values: CreateScheduleRequest = request.clone().into();
                let revived = self.revive(other.id, &values, auth_token).await?;

                // Retire the original row now that the revived one carries the day.
                let patch = json!({ "deleted_at": Utc::now().to_rfc3339() });
                let _: DoctorSchedule = self
                    .supabase
                    .update_returning(
                        SCHEDULES,
                        &format!("id=eq.{}", target.id),
                        patch,
                        Some(auth_token),
                    )
                    .await
                    .map_err(|e| ScheduleError::Database(e.to_string()))?;

                info!(
                    "Schedule {} revived for doctor {} on {}; schedule {} retired",
                    revived.id, revived.doctor_id, revived.date, target.id
                );
                Ok(revived)
            }
            _ => {
                let patch = json!({
                    "doctor_id": request.doctor_id,
                    "date": request.date.format("%Y-%m-%d").to_string(),
                    "start_time": request.start_time.format("%H:%M:%S").to_string(),
                    "end_time": request.end_time.format("%H:%M:%S").to_string(),
                    "updated_at": Utc::now().to_rfc3339(),
                });

                let updated: DoctorSchedule = self
                    .supabase
                    .update_returning(
                        SCHEDULES,
                        &format!("id=eq.{}", target.id),
                        patch,
                        Some(auth_token),
                    )
                    .await
                    .map_err(|e| ScheduleError::Database(e.to_string()))?;

                info!("Schedule {} updated in place", updated.id);
                Ok(updated)
            }
        }
    }

    /// Soft-delete a schedule record.
    pub async fn delete_schedule(
        &self,
        schedule_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        debug!("Soft-deleting schedule {}", schedule_id);

        self.find_by_id(schedule_id, RecordScope::Active, auth_token)
            .await?
            .ok_or(ScheduleError::NotFound)?;

        let patch = json!({ "deleted_at": Utc::now().to_rfc3339() });

        self.supabase
            .update_returning(SCHEDULES, &format!("id=eq.{}", schedule_id), patch, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))
    }

    pub async fn get_schedule(
        &self,
        schedule_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        self.find_by_id(schedule_id, RecordScope::Active, auth_token)
            .await?
            .ok_or(ScheduleError::NotFound)
    }

    pub async fn list_schedules(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<DoctorSchedule>, ScheduleError> {
        let filters = RecordScope::Active.apply(&format!(
            "doctor_id=eq.{}&order=date.asc",
            doctor_id
        ));

        self.supabase
            .fetch_all(SCHEDULES, &filters, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))
    }

    /// The doctor's active working-hours record for a date, if any.
    pub async fn active_schedule_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Option<DoctorSchedule>, ScheduleError> {
        self.find_for_day(doctor_id, date, RecordScope::Active, auth_token)
            .await
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn find_by_id(
        &self,
        schedule_id: Uuid,
        scope: RecordScope,
        auth_token: &str,
    ) -> Result<Option<DoctorSchedule>, ScheduleError> {
        let filter = scope.apply(&format!("id=eq.{}", schedule_id));
        self.supabase
            .fetch_optional(SCHEDULES, &filter, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))
    }

    async fn find_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        scope: RecordScope,
        auth_token: &str,
    ) -> Result<Option<DoctorSchedule>, ScheduleError> {
        let filter = scope.apply(&format!(
            "doctor_id=eq.{}&date=eq.{}",
            doctor_id,
            date.format("%Y-%m-%d")
        ));
        self.supabase
            .fetch_optional(SCHEDULES, &filter, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))
    }

    async fn has_active_appointment(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<bool, ScheduleError> {
        let filter = RecordScope::Active.apply(&format!(
            "doctor_id=eq.{}&date=eq.{}",
            doctor_id,
            date.format("%Y-%m-%d")
        ));
        let appointment: Option<Value> = self
            .supabase
            .fetch_optional(APPOINTMENTS, &filter, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))?;

        Ok(appointment.is_some())
    }

    async fn ensure_doctor_exists(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        let filter = RecordScope::Active.apply(&format!("id=eq.{}", doctor_id));
        let doctor: Option<Value> = self
            .supabase
            .fetch_optional(DOCTORS, &filter, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))?;

        doctor.map(|_| ()).ok_or(ScheduleError::DoctorNotFound)
    }

    /// Point a soft-deleted row at the requested day and clear its markers.
    async fn revive(
        &self,
        slot_id: Uuid,
        request: &CreateScheduleRequest,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        let patch = json!({
            "doctor_id": request.doctor_id,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "updated_at": Value::Null,
            "deleted_at": Value::Null,
        });

        self.supabase
            .update_returning(SCHEDULES, &format!("id=eq.{}", slot_id), patch, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))
    }
}

impl From<UpdateScheduleRequest> for CreateScheduleRequest {
    fn from(request: UpdateScheduleRequest) -> Self {
        Self {
            doctor_id: request.doctor_id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
        }
    }
}

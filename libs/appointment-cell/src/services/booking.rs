use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use branch_cell::models::Branch;
use doctor_cell::models::Doctor;
use doctor_cell::services::{doctor::DoctorService, schedule::ScheduleService};
use notification_cell::models::AppointmentConfirmation;
use notification_cell::services::dispatch::NotificationDispatcher;
use patient_cell::models::{Patient, PatientError};
use patient_cell::services::patient::PatientService;
use shared_config::AppConfig;
use shared_database::{DatabaseError, RecordScope, SupabaseClient};

use crate::models::{
    Appointment, AppointmentDetails, AppointmentSearchQuery, BookingError,
    CreateAppointmentRequest,
};

const TABLE: &str = "appointments";

pub struct BookingService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
    patient_service: PatientService,
    schedule_service: ScheduleService,
    dispatcher: NotificationDispatcher,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Result<Self, BookingError> {
        Ok(Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
            patient_service: PatientService::new(config)
                .map_err(|e| BookingError::Database(e.to_string()))?,
            schedule_service: ScheduleService::new(config),
            dispatcher: NotificationDispatcher::new(config),
        })
    }

    /// Book an appointment.
    ///
    /// A soft-deleted row for the same `(patient, doctor, date)` triple is
    /// revived with the requested time rather than inserting a second row.
    /// The confirmation email is handed off after the write commits; its
    /// delivery cannot fail the booking.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<AppointmentDetails, BookingError> {
        info!(
            "Booking appointment for patient {} with doctor {} on {}",
            request.patient_id, request.doctor_id, request.date
        );

        let (doctor, patient, branch) = self
            .resolve_aggregates(request.doctor_id, request.patient_id, auth_token)
            .await?;

        self.ensure_within_working_hours(&request, auth_token).await?;

        // Fast pre-check for a friendly error; the partial unique index over
        // active rows is the invariant that actually holds under races.
        if self
            .find_for_triple(&request, RecordScope::Active, auth_token)
            .await?
            .is_some()
        {
            return Err(BookingError::AlreadyBooked);
        }

        let dormant = self
            .find_for_triple(&request, RecordScope::Deleted, auth_token)
            .await?;

        let appointment = match dormant {
            Some(slot) => {
                debug!("Reviving cancelled appointment {} for the new booking", slot.id);
                self.revive(slot.id, &request, auth_token).await?
            }
            None => self.insert(&request, auth_token).await?,
        };

        let details = AppointmentDetails {
            appointment,
            doctor,
            patient,
            branch,
        };

        self.dispatcher
            .dispatch_confirmation(confirmation_for(&details));

        info!("Appointment {} booked", details.appointment.id);
        Ok(details)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentDetails, BookingError> {
        debug!("Fetching appointment {}", appointment_id);

        let appointment = self.fetch_active(appointment_id, auth_token).await?;

        let (doctor, patient, branch) = self
            .resolve_aggregates(appointment.doctor_id, appointment.patient_id, auth_token)
            .await?;

        Ok(AppointmentDetails {
            appointment,
            doctor,
            patient,
            branch,
        })
    }

    /// Cancel a booking. The row is soft-deleted and stays eligible for
    /// revival if the same triple books again.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        debug!("Cancelling appointment {}", appointment_id);

        self.fetch_active(appointment_id, auth_token).await?;

        let patch = json!({
            "status": false,
            "deleted_at": Utc::now().to_rfc3339(),
        });

        let cancelled: Appointment = self
            .supabase
            .update_returning(TABLE, &format!("id=eq.{}", appointment_id), patch, Some(auth_token))
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(from_date) = query.from_date {
            query_parts.push(format!("date=gte.{}", from_date.format("%Y-%m-%d")));
        }
        if let Some(to_date) = query.to_date {
            query_parts.push(format!("date=lte.{}", to_date.format("%Y-%m-%d")));
        }

        query_parts.push("order=date.asc".to_string());

        if let Some(limit) = query.limit {
            query_parts.push(format!("limit={}", limit));
        }
        if let Some(offset) = query.offset {
            query_parts.push(format!("offset={}", offset));
        }

        let filters = RecordScope::Active.apply(&query_parts.join("&"));

        self.supabase
            .fetch_all(TABLE, &filters, Some(auth_token))
            .await
            .map_err(|e| BookingError::Database(e.to_string()))
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn resolve_aggregates(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<(Doctor, Patient, Branch), BookingError> {
        let doctor_with_branch = self
            .doctor_service
            .get_doctor(doctor_id, Some(auth_token))
            .await
            .map_err(|e| match e {
                doctor_cell::models::DoctorError::NotFound => BookingError::DoctorNotFound,
                other => BookingError::Database(other.to_string()),
            })?;

        let branch = doctor_with_branch
            .branch
            .ok_or(BookingError::BranchNotFound)?;

        let patient = self
            .patient_service
            .get_patient(patient_id, auth_token)
            .await
            .map_err(|e| match e {
                PatientError::NotFound => BookingError::PatientNotFound,
                other => BookingError::Database(other.to_string()),
            })?;

        Ok((doctor_with_branch.doctor, patient, branch))
    }

    /// The requested slot must fall inside the doctor's active working-hours
    /// record for that date.
    async fn ensure_within_working_hours(
        &self,
        request: &CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        let schedule = self
            .schedule_service
            .active_schedule_for_day(request.doctor_id, request.date, auth_token)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        match schedule {
            Some(schedule) if schedule.covers(request.time) => Ok(()),
            Some(_) => {
                warn!(
                    "Requested time {} outside working hours for doctor {} on {}",
                    request.time, request.doctor_id, request.date
                );
                Err(BookingError::OutsideScheduleHours)
            }
            None => Err(BookingError::OutsideScheduleHours),
        }
    }

    async fn find_for_triple(
        &self,
        request: &CreateAppointmentRequest,
        scope: RecordScope,
        auth_token: &str,
    ) -> Result<Option<Appointment>, BookingError> {
        let filter = scope.apply(&format!(
            "patient_id=eq.{}&doctor_id=eq.{}&date=eq.{}",
            request.patient_id,
            request.doctor_id,
            request.date.format("%Y-%m-%d")
        ));

        self.supabase
            .fetch_optional(TABLE, &filter, Some(auth_token))
            .await
            .map_err(|e| BookingError::Database(e.to_string()))
    }

    async fn revive(
        &self,
        slot_id: Uuid,
        request: &CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let patch = json!({
            "time": request.time.format("%H:%M:%S").to_string(),
            "status": request.status,
            "updated_at": Utc::now().to_rfc3339(),
            "deleted_at": Value::Null,
        });

        self.supabase
            .update_returning(TABLE, &format!("id=eq.{}", slot_id), patch, Some(auth_token))
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => BookingError::StorageConflict,
                other => BookingError::Database(other.to_string()),
            })
    }

    async fn insert(
        &self,
        request: &CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let row = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "time": request.time.format("%H:%M:%S").to_string(),
            "status": request.status,
            "created_at": Utc::now().to_rfc3339(),
        });

        self.supabase
            .insert_returning(TABLE, row, Some(auth_token))
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => BookingError::StorageConflict,
                other => BookingError::Database(other.to_string()),
            })
    }

    async fn fetch_active(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let filter = RecordScope::Active.apply(&format!("id=eq.{}", appointment_id));
        self.supabase
            .fetch_optional(TABLE, &filter, Some(auth_token))
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?
            .ok_or(BookingError::NotFound)
    }
}

fn confirmation_for(details: &AppointmentDetails) -> AppointmentConfirmation {
    AppointmentConfirmation {
        patient_first_name: details.patient.first_name.clone(),
        patient_last_name: details.patient.last_name.clone(),
        patient_email: details.patient.email.clone(),
        doctor_title: details.doctor.title.clone(),
        doctor_first_name: details.doctor.first_name.clone(),
        doctor_last_name: details.doctor.last_name.clone(),
        branch_name: details.branch.name.clone(),
        date: details.appointment.date,
        time: details.appointment.time,
    }
}

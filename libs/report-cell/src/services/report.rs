use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::Appointment;
use doctor_cell::models::Doctor;
use patient_cell::models::Patient;
use patient_cell::services::identity::IdentityCipher;
use shared_config::AppConfig;
use shared_database::{RecordScope, SupabaseClient};

use crate::models::{
    CreateReportRequest, Report, ReportDetails, ReportError, UpdateReportRequest,
};

const TABLE: &str = "reports";

pub struct ReportService {
    supabase: SupabaseClient,
    cipher: IdentityCipher,
}

impl ReportService {
    pub fn new(config: &AppConfig) -> Result<Self, ReportError> {
        Ok(Self {
            supabase: SupabaseClient::new(config),
            cipher: IdentityCipher::from_config(config)
                .map_err(|e| ReportError::Identity(e.to_string()))?,
        })
    }

    pub async fn create_report(
        &self,
        request: CreateReportRequest,
        auth_token: &str,
    ) -> Result<Report, ReportError> {
        debug!("Creating report for appointment {}", request.appointment_id);

        // The appointment must exist; cancelled ones still take reports.
        self.fetch_appointment(request.appointment_id, auth_token)
            .await?;

        let row = json!({
            "appointment_id": request.appointment_id,
            "text": request.text,
            "created_at": Utc::now().to_rfc3339(),
        });

        let report: Report = self
            .supabase
            .insert_returning(TABLE, row, Some(auth_token))
            .await
            .map_err(|e| ReportError::Database(e.to_string()))?;

        info!("Report {} created for appointment {}", report.id, report.appointment_id);
        Ok(report)
    }

    pub async fn update_report(
        &self,
        report_id: Uuid,
        request: UpdateReportRequest,
        auth_token: &str,
    ) -> Result<Report, ReportError> {
        debug!("Updating report {}", report_id);

        self.fetch_active(report_id, auth_token).await?;

        let patch = json!({
            "text": request.text,
            "updated_at": Utc::now().to_rfc3339(),
        });

        self.supabase
            .update_returning(TABLE, &format!("id=eq.{}", report_id), patch, Some(auth_token))
            .await
            .map_err(|e| ReportError::Database(e.to_string()))
    }

    /// Soft-delete a report.
    pub async fn delete_report(
        &self,
        report_id: Uuid,
        auth_token: &str,
    ) -> Result<Report, ReportError> {
        debug!("Soft-deleting report {}", report_id);

        self.fetch_active(report_id, auth_token).await?;

        let patch = json!({ "deleted_at": Utc::now().to_rfc3339() });

        self.supabase
            .update_returning(TABLE, &format!("id=eq.{}", report_id), patch, Some(auth_token))
            .await
            .map_err(|e| ReportError::Database(e.to_string()))
    }

    /// Fetch a report with the appointment, doctor, and patient attached.
    pub async fn get_report(
        &self,
        report_id: Uuid,
        auth_token: &str,
    ) -> Result<ReportDetails, ReportError> {
        debug!("Fetching report {}", report_id);

        let report = self.fetch_active(report_id, auth_token).await?;
        let appointment = self.fetch_appointment(report.appointment_id, auth_token).await?;
        let doctor = self.fetch_doctor(appointment.doctor_id, auth_token).await?;
        let patient = self.fetch_patient(appointment.patient_id, auth_token).await?;

        self.build_details(&report, &appointment, &doctor, &patient)
    }

    pub async fn list_reports(
        &self,
        limit: Option<i32>,
        offset: Option<i32>,
        auth_token: &str,
    ) -> Result<Vec<Report>, ReportError> {
        let mut filters = RecordScope::Active.apply("order=created_at.desc");

        if let Some(limit) = limit {
            filters.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = offset {
            filters.push_str(&format!("&offset={}", offset));
        }

        self.supabase
            .fetch_all(TABLE, &filters, Some(auth_token))
            .await
            .map_err(|e| ReportError::Database(e.to_string()))
    }

    /// All reports written against a doctor's appointments, enriched for
    /// rendering.
    pub async fn list_reports_by_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ReportDetails>, ReportError> {
        debug!("Listing reports for doctor {}", doctor_id);

        let doctor = self.fetch_doctor(doctor_id, auth_token).await?;

        let appointments: Vec<Appointment> = self
            .supabase
            .fetch_all(
                "appointments",
                &format!("doctor_id=eq.{}", doctor_id),
                Some(auth_token),
            )
            .await
            .map_err(|e| ReportError::Database(e.to_string()))?;

        if appointments.is_empty() {
            return Ok(Vec::new());
        }

        let by_id: HashMap<Uuid, &Appointment> =
            appointments.iter().map(|a| (a.id, a)).collect();

        let id_list = appointments
            .iter()
            .map(|a| a.id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let reports: Vec<Report> = self
            .supabase
            .fetch_all(
                TABLE,
                &RecordScope::Active.apply(&format!("appointment_id=in.({})", id_list)),
                Some(auth_token),
            )
            .await
            .map_err(|e| ReportError::Database(e.to_string()))?;

        let mut patients: HashMap<Uuid, Patient> = HashMap::new();
        let mut details = Vec::with_capacity(reports.len());

        for report in &reports {
            let appointment = match by_id.get(&report.appointment_id) {
                Some(appointment) => *appointment,
                None => continue,
            };

            if !patients.contains_key(&appointment.patient_id) {
                let patient = self.fetch_patient(appointment.patient_id, auth_token).await?;
                patients.insert(appointment.patient_id, patient);
            }
            let patient = &patients[&appointment.patient_id];

            details.push(self.build_details(report, appointment, &doctor, patient)?);
        }

        Ok(details)
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    fn build_details(
        &self,
        report: &Report,
        appointment: &Appointment,
        doctor: &Doctor,
        patient: &Patient,
    ) -> Result<ReportDetails, ReportError> {
        let patient_identity = self
            .cipher
            .decrypt(&patient.national_identity)
            .map_err(|e| ReportError::Identity(e.to_string()))?;

        Ok(ReportDetails {
            id: report.id,
            text: report.text.clone(),
            report_date: report.created_at,
            appointment_id: appointment.id,
            appointment_date: appointment.date,
            appointment_time: appointment.time,
            doctor_id: doctor.id,
            doctor_title: doctor.title.clone(),
            doctor_first_name: doctor.first_name.clone(),
            doctor_last_name: doctor.last_name.clone(),
            patient_id: patient.id,
            patient_first_name: patient.first_name.clone(),
            patient_last_name: patient.last_name.clone(),
            patient_identity,
        })
    }

    async fn fetch_active(&self, report_id: Uuid, auth_token: &str) -> Result<Report, ReportError> {
        let filter = RecordScope::Active.apply(&format!("id=eq.{}", report_id));
        self.supabase
            .fetch_optional(TABLE, &filter, Some(auth_token))
            .await
            .map_err(|e| ReportError::Database(e.to_string()))?
            .ok_or(ReportError::NotFound)
    }

    /// Reports outlive cancellations, so aggregate lookups ignore delete
    /// markers.
    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, ReportError> {
        self.supabase
            .fetch_optional(
                "appointments",
                &RecordScope::Any.apply(&format!("id=eq.{}", appointment_id)),
                Some(auth_token),
            )
            .await
            .map_err(|e| ReportError::Database(e.to_string()))?
            .ok_or(ReportError::AppointmentNotFound)
    }

    async fn fetch_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Doctor, ReportError> {
        self.supabase
            .fetch_optional(
                "doctors",
                &RecordScope::Any.apply(&format!("id=eq.{}", doctor_id)),
                Some(auth_token),
            )
            .await
            .map_err(|e| ReportError::Database(e.to_string()))?
            .ok_or(ReportError::DoctorNotFound)
    }

    async fn fetch_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Patient, ReportError> {
        self.supabase
            .fetch_optional(
                "patients",
                &RecordScope::Any.apply(&format!("id=eq.{}", patient_id)),
                Some(auth_token),
            )
            .await
            .map_err(|e| ReportError::Database(e.to_string()))?
            .ok_or(ReportError::PatientNotFound)
    }
}

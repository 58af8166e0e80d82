use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Outbound email as handed to the mail API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Everything the confirmation email needs, resolved by the booking path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentConfirmation {
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_email: String,
    pub doctor_title: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
    pub branch_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Mail transport is not configured")]
    NotConfigured,

    #[error("Mail API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Mail transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{AppointmentConfirmation, EmailMessage, NotificationError};

/// HTTP mail API client.
///
/// Delivery goes through a transactional mail provider's REST endpoint; the
/// provider handles the SMTP leg.
pub struct Mailer {
    client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
    from_name: String,
}

impl Mailer {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_mail_configured() {
            return Err(NotificationError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from_address: config.mail_from_address.clone(),
            from_name: config.mail_from_name.clone(),
        })
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let url = format!("{}/send", self.api_url);
        debug!("Sending '{}' to {} via {}", message.subject, message.to, url);

        let body = json!({
            "from": format!("{} <{}>", self.from_name, self.from_address),
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message_text = response.text().await.unwrap_or_default();
            error!("Mail API rejected message ({}): {}", status, message_text);
            return Err(NotificationError::Api {
                status: status.as_u16(),
                message: message_text,
            });
        }

        info!("Email delivered to {}", message.to);
        Ok(())
    }
}

/// Render the appointment confirmation email.
pub fn confirmation_email(confirmation: &AppointmentConfirmation) -> EmailMessage {
    let html = format!(
        r#"<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; }}
        .container {{ border: 1px solid #ccc; padding: 10px; }}
    </style>
</head>
<body>
    <div class="container">
        <p>Dear {patient_first} {patient_last},</p>
        <p>Your appointment is booked for {date} at {time}.</p>
        <p>Doctor: {doctor_title} {doctor_first} {doctor_last}</p>
        <p>Branch: {branch}</p>
    </div>
</body>
</html>"#,
        patient_first = confirmation.patient_first_name,
        patient_last = confirmation.patient_last_name,
        date = confirmation.date.format("%Y-%m-%d"),
        time = confirmation.time.format("%H:%M"),
        doctor_title = confirmation.doctor_title,
        doctor_first = confirmation.doctor_first_name,
        doctor_last = confirmation.doctor_last_name,
        branch = confirmation.branch_name,
    );

    EmailMessage {
        to: confirmation.patient_email.clone(),
        subject: "Appointment confirmation".to_string(),
        html,
    }
}

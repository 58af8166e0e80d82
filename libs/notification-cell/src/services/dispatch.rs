use tracing::{error, info, warn};

use shared_config::AppConfig;

use crate::models::{AppointmentConfirmation, NotificationError};
use crate::services::mailer::{confirmation_email, Mailer};

/// Hands confirmations off for delivery after the booking write has
/// committed. Delivery runs on its own task; a failure is logged and never
/// surfaces to the booking caller, so a committed appointment is never
/// reported as failed because the mail leg was down.
pub struct NotificationDispatcher {
    config: AppConfig,
}

impl NotificationDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn dispatch_confirmation(&self, confirmation: AppointmentConfirmation) {
        let config = self.config.clone();

        tokio::spawn(async move {
            let recipient = confirmation.patient_email.clone();

            match Self::deliver(&config, confirmation).await {
                Ok(()) => info!("Appointment confirmation delivered to {}", recipient),
                Err(NotificationError::NotConfigured) => {
                    warn!("Mail transport not configured; confirmation to {} skipped", recipient)
                }
                Err(e) => error!("Appointment confirmation to {} failed: {}", recipient, e),
            }
        });
    }

    /// Inline delivery for callers that need the outcome.
    pub async fn send_confirmation(
        &self,
        confirmation: &AppointmentConfirmation,
    ) -> Result<(), NotificationError> {
        Self::deliver(&self.config, confirmation.clone()).await
    }

    async fn deliver(
        config: &AppConfig,
        confirmation: AppointmentConfirmation,
    ) -> Result<(), NotificationError> {
        let mailer = Mailer::new(config)?;
        let message = confirmation_email(&confirmation);
        mailer.send(&message).await
    }
}

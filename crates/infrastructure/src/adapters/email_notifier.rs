//! Email notifier - Implements `NotificationPort` by rendering and sending mail
//!
//! This is the consumer-side notifier: jobs pulled off the queues end up here.

use std::sync::Arc;

use application::{
    error::ApplicationError,
    jobs::{ConfirmationJob, ForecastJob},
    ports::{EmailSenderPort, NotificationPort, OutgoingEmail},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::templates::{TemplateEngine, TemplateError};

/// Email subject lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSubjects {
    #[serde(default = "default_confirmation_subject")]
    pub confirmation: String,

    /// `{city}` is replaced with the subscriber's city
    #[serde(default = "default_forecast_subject")]
    pub weather_forecast: String,
}

fn default_confirmation_subject() -> String {
    "Confirm your weather subscription".to_string()
}

fn default_forecast_subject() -> String {
    "Weather forecast for {city}".to_string()
}

impl Default for EmailSubjects {
    fn default() -> Self {
        Self {
            confirmation: default_confirmation_subject(),
            weather_forecast: default_forecast_subject(),
        }
    }
}

impl EmailSubjects {
    fn forecast_for(&self, city: &str) -> String {
        self.weather_forecast.replace("{city}", city)
    }
}

/// Renders job templates and hands the result to an [`EmailSenderPort`]
pub struct TemplatedEmailNotifier {
    templates: TemplateEngine,
    sender: Arc<dyn EmailSenderPort>,
    subjects: EmailSubjects,
}

impl std::fmt::Debug for TemplatedEmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplatedEmailNotifier")
            .field("templates", &self.templates)
            .field("subjects", &self.subjects)
            .finish_non_exhaustive()
    }
}

impl TemplatedEmailNotifier {
    #[must_use]
    pub fn new(
        templates: TemplateEngine,
        sender: Arc<dyn EmailSenderPort>,
        subjects: EmailSubjects,
    ) -> Self {
        Self {
            templates,
            sender,
            subjects,
        }
    }

    fn render_error(e: TemplateError) -> ApplicationError {
        ApplicationError::Internal(format!("Failed to render email: {e}"))
    }
}

#[async_trait]
impl NotificationPort for TemplatedEmailNotifier {
    #[instrument(skip(self, job), fields(email = %job.email))]
    async fn send_confirmation(&self, job: &ConfirmationJob) -> Result<(), ApplicationError> {
        let body = self
            .templates
            .render_confirmation(&job.confirmation_link)
            .map_err(Self::render_error)?;
        let email = OutgoingEmail::new(job.email.clone(), &self.subjects.confirmation, body)?;

        self.sender.send(&email).await?;
        info!("Confirmation email sent");
        Ok(())
    }

    #[instrument(skip(self, job), fields(email = %job.recipient().email, city = %job.recipient().city))]
    async fn send_forecast(&self, job: &ForecastJob) -> Result<(), ApplicationError> {
        let recipient = job.recipient();
        let city = recipient.city.as_str();

        let body = match job {
            ForecastJob::Hourly(j) => self.templates.render_hourly_forecast(
                city,
                &j.weather,
                &j.date,
                &j.unsubscribe_link,
            ),
            ForecastJob::Daily(j) => self.templates.render_daily_forecast(
                city,
                &j.weather,
                &j.date,
                &j.unsubscribe_link,
            ),
        }
        .map_err(Self::render_error)?;

        let email = OutgoingEmail::new(
            recipient.email.clone(),
            self.subjects.forecast_for(city),
            body,
        )?;

        self.sender.send(&email).await?;
        info!(queue = job.queue(), "Forecast email sent");
        Ok(())
    }
}

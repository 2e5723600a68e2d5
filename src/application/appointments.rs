use std::sync::Arc;

use thiserror::Error;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        repos::{AppointmentsRepo, CreateAppointmentParams, RepoError, SettingsRepo},
        validate::{ensure_email, ensure_non_empty, optional_text},
    },
    domain::{
        entities::AppointmentRecord,
        error::DomainError,
        types::{AppointmentStatus, AppointmentType},
    },
};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("online booking is currently disabled")]
    BookingDisabled,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AppointmentError {
    fn not_found() -> Self {
        Self::Domain(DomainError::not_found("appointment"))
    }
}

/// Public booking form. Required fields arrive as possibly-empty strings so
/// that missing values are reported as validation errors.
#[derive(Debug, Clone, Default)]
pub struct BookAppointmentCommand {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service: String,
    pub preferred_date: String,
    pub preferred_time: Option<String>,
    pub device_type: Option<String>,
    pub device_model: Option<String>,
    pub issue_description: Option<String>,
    pub appointment_type: Option<AppointmentType>,
}

#[derive(Clone)]
pub struct AppointmentService {
    repo: Arc<dyn AppointmentsRepo>,
    settings: Arc<dyn SettingsRepo>,
}

impl AppointmentService {
    pub fn new(repo: Arc<dyn AppointmentsRepo>, settings: Arc<dyn SettingsRepo>) -> Self {
        Self { repo, settings }
    }

    pub async fn book(
        &self,
        command: BookAppointmentCommand,
    ) -> Result<AppointmentRecord, AppointmentError> {
        let params = validate_booking(command)?;

        if !self.settings.load_site_settings().await?.booking_enabled {
            return Err(AppointmentError::BookingDisabled);
        }

        let appointment = self.repo.create_appointment(params).await?;
        info!(
            target = "shopfront::application::appointments",
            appointment_id = %appointment.id,
            date = %appointment.preferred_date,
            "appointment requested"
        );
        Ok(appointment)
    }

    pub async fn list(
        &self,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, AppointmentError> {
        Ok(self.repo.list_appointments(status).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<AppointmentRecord, AppointmentError> {
        self.repo
            .find_appointment(id)
            .await?
            .ok_or_else(AppointmentError::not_found)
    }

    /// Re-applying the current status returns the record unchanged.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, AppointmentError> {
        let current = self.get(id).await?;
        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(DomainError::transition(
                "appointment",
                current.status.as_str(),
                status.as_str(),
            )
            .into());
        }
        self.repo
            .update_appointment_status(id, status)
            .await
            .map_err(not_found_as_domain)
    }

    pub async fn set_notes(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<AppointmentRecord, AppointmentError> {
        self.repo
            .update_appointment_notes(id, optional_text(notes))
            .await
            .map_err(not_found_as_domain)
    }
}

fn validate_booking(
    command: BookAppointmentCommand,
) -> Result<CreateAppointmentParams, DomainError> {
    ensure_non_empty(&command.customer_name, "customer_name")?;
    ensure_email(&command.customer_email, "customer_email")?;
    ensure_non_empty(&command.customer_phone, "customer_phone")?;
    ensure_non_empty(&command.service, "service")?;
    ensure_non_empty(&command.preferred_date, "preferred_date")?;

    let preferred_date = parse_date(&command.preferred_date)?;

    Ok(CreateAppointmentParams {
        customer_name: command.customer_name.trim().to_string(),
        customer_email: command.customer_email.trim().to_string(),
        customer_phone: command.customer_phone.trim().to_string(),
        service: command.service.trim().to_string(),
        device_type: optional_text(command.device_type),
        device_model: optional_text(command.device_model),
        issue_description: optional_text(command.issue_description),
        preferred_date,
        preferred_time: optional_text(command.preferred_time),
        appointment_type: command.appointment_type.unwrap_or_default(),
    })
}

fn parse_date(value: &str) -> Result<Date, DomainError> {
    Date::parse(value.trim(), DATE_FORMAT)
        .map_err(|_| DomainError::validation("preferred_date must be formatted as YYYY-MM-DD"))
}

fn not_found_as_domain(err: RepoError) -> AppointmentError {
    match err {
        RepoError::NotFound => AppointmentError::not_found(),
        other => AppointmentError::Repo(other),
    }
}

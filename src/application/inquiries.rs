use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        repos::{CreateInquiryParams, InquiriesRepo, RepoError},
        validate::{ensure_email, ensure_non_empty, optional_text},
    },
    domain::{
        entities::InquiryRecord,
        error::DomainError,
        types::{InquiryStatus, InquiryUrgency},
    },
};

#[derive(Debug, Error)]
pub enum InquiryError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl InquiryError {
    fn not_found() -> Self {
        Self::Domain(DomainError::not_found("inquiry"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmitInquiryCommand {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service: Option<String>,
    pub urgency: Option<InquiryUrgency>,
    pub message: String,
}

#[derive(Clone)]
pub struct InquiryService {
    repo: Arc<dyn InquiriesRepo>,
}

impl InquiryService {
    pub fn new(repo: Arc<dyn InquiriesRepo>) -> Self {
        Self { repo }
    }

    pub async fn submit(
        &self,
        command: SubmitInquiryCommand,
    ) -> Result<InquiryRecord, InquiryError> {
        ensure_non_empty(&command.name, "name")?;
        ensure_email(&command.email, "email")?;
        ensure_non_empty(&command.message, "message")?;

        let inquiry = self
            .repo
            .create_inquiry(CreateInquiryParams {
                name: command.name.trim().to_string(),
                email: command.email.trim().to_string(),
                phone: optional_text(command.phone),
                service: optional_text(command.service),
                urgency: command.urgency.unwrap_or_default(),
                message: command.message.trim().to_string(),
            })
            .await?;
        info!(
            target = "shopfront::application::inquiries",
            inquiry_id = %inquiry.id,
            urgency = ?inquiry.urgency,
            "inquiry received"
        );
        Ok(inquiry)
    }

    /// Most urgent first, oldest first within the same urgency.
    pub async fn list(
        &self,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<InquiryRecord>, InquiryError> {
        Ok(self.repo.list_inquiries(status).await?)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: InquiryStatus,
    ) -> Result<InquiryRecord, InquiryError> {
        self.repo
            .update_inquiry_status(id, status)
            .await
            .map_err(not_found_as_domain)
    }

    /// Stores the reply and stamps `responded_at`. A `new` inquiry moves to
    /// `in_progress`; any other status is kept.
    pub async fn respond(&self, id: Uuid, response: String) -> Result<InquiryRecord, InquiryError> {
        ensure_non_empty(&response, "response")?;
        let current = self
            .repo
            .find_inquiry(id)
            .await?
            .ok_or_else(InquiryError::not_found)?;

        let status = status_after_response(current.status);
        self.repo
            .record_inquiry_response(
                id,
                response.trim().to_string(),
                status,
                OffsetDateTime::now_utc(),
            )
            .await
            .map_err(not_found_as_domain)
    }
}

fn status_after_response(current: InquiryStatus) -> InquiryStatus {
    match current {
        InquiryStatus::New => InquiryStatus::InProgress,
        other => other,
    }
}

fn not_found_as_domain(err: RepoError) -> InquiryError {
    match err {
        RepoError::NotFound => InquiryError::not_found(),
        other => InquiryError::Repo(other),
    }
}

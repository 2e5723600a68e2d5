use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        repos::{
            CreateRepairRequestParams, RepairRequestWithCustomer, RepairsRepo, RepoError,
            UpsertCustomerParams,
        },
        validate::{ensure_email, ensure_non_empty, optional_text},
    },
    domain::{
        entities::{CustomerRecord, RepairRequestRecord},
        error::DomainError,
        types::RepairStatus,
    },
};

#[derive(Debug, Error)]
pub enum RepairError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl RepairError {
    fn not_found() -> Self {
        Self::Domain(DomainError::not_found("repair request"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmitRepairCommand {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub device_type: String,
    pub issue_description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairIntake {
    pub customer: CustomerRecord,
    pub request: RepairRequestRecord,
}

#[derive(Clone)]
pub struct RepairService {
    repo: Arc<dyn RepairsRepo>,
}

impl RepairService {
    pub fn new(repo: Arc<dyn RepairsRepo>) -> Self {
        Self { repo }
    }

    /// Customers are keyed by lower-cased email; a returning customer keeps
    /// their id and gets their name and phone refreshed.
    pub async fn submit(&self, command: SubmitRepairCommand) -> Result<RepairIntake, RepairError> {
        ensure_non_empty(&command.name, "name")?;
        ensure_email(&command.email, "email")?;
        ensure_non_empty(&command.device_type, "device_type")?;
        ensure_non_empty(&command.issue_description, "issue_description")?;

        let customer = self
            .repo
            .upsert_customer(UpsertCustomerParams {
                name: command.name.trim().to_string(),
                email: command.email.trim().to_lowercase(),
                phone: optional_text(command.phone),
            })
            .await?;

        let request = self
            .repo
            .create_repair_request(CreateRepairRequestParams {
                customer_id: customer.id,
                device_type: command.device_type.trim().to_string(),
                issue_description: command.issue_description.trim().to_string(),
            })
            .await?;
        info!(
            target = "shopfront::application::repairs",
            request_id = %request.id,
            customer_id = %customer.id,
            "repair request received"
        );

        Ok(RepairIntake { customer, request })
    }

    pub async fn list(
        &self,
        status: Option<RepairStatus>,
    ) -> Result<Vec<RepairRequestWithCustomer>, RepairError> {
        Ok(self.repo.list_repair_requests(status).await?)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRecord, RepairError> {
        let current = self
            .repo
            .find_repair_request(id)
            .await?
            .ok_or_else(RepairError::not_found)?;
        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(DomainError::transition(
                "repair request",
                current.status.as_str(),
                status.as_str(),
            )
            .into());
        }
        self.repo
            .update_repair_status(id, status)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => RepairError::not_found(),
                other => RepairError::Repo(other),
            })
    }
}

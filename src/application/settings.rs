use std::sync::Arc;

use thiserror::Error;

use crate::{
    application::{
        invalidation::ContentInvalidator,
        repos::{RepoError, SettingsRepo},
        validate::{ensure_email, ensure_non_empty, optional_text},
    },
    domain::{entities::SiteSettingsRecord, error::DomainError},
};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Partial update; `None` keeps the stored value. For the optional text
/// fields an empty string clears them.
#[derive(Debug, Clone, Default)]
pub struct UpdateSettingsCommand {
    pub business_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub opening_hours: Option<String>,
    pub booking_enabled: Option<bool>,
}

#[derive(Clone)]
pub struct SettingsService {
    repo: Arc<dyn SettingsRepo>,
    invalidator: ContentInvalidator,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepo>, invalidator: ContentInvalidator) -> Self {
        Self { repo, invalidator }
    }

    pub async fn load(&self) -> Result<SiteSettingsRecord, SettingsError> {
        Ok(self.repo.load_site_settings().await?)
    }

    pub async fn update(
        &self,
        command: UpdateSettingsCommand,
    ) -> Result<SiteSettingsRecord, SettingsError> {
        let current = self.repo.load_site_settings().await?;
        let next = apply_update(current, command)?;
        let saved = self.repo.upsert_site_settings(next).await?;
        self.invalidator.settings_changed().await;
        Ok(saved)
    }
}

fn apply_update(
    mut settings: SiteSettingsRecord,
    command: UpdateSettingsCommand,
) -> Result<SiteSettingsRecord, DomainError> {
    if let Some(name) = command.business_name {
        ensure_non_empty(&name, "business_name")?;
        settings.business_name = name.trim().to_string();
    }
    if let Some(email) = command.contact_email {
        ensure_email(&email, "contact_email")?;
        settings.contact_email = email.trim().to_string();
    }
    if let Some(phone) = command.contact_phone {
        settings.contact_phone = optional_text(Some(phone));
    }
    if let Some(address) = command.address {
        settings.address = optional_text(Some(address));
    }
    if let Some(hours) = command.opening_hours {
        settings.opening_hours = optional_text(Some(hours));
    }
    if let Some(enabled) = command.booking_enabled {
        settings.booking_enabled = enabled;
    }
    Ok(settings)
}

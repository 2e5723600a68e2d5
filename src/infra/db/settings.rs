use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, SettingsRepo},
    domain::entities::SiteSettingsRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SiteSettingsRow {
    business_name: String,
    contact_email: String,
    contact_phone: Option<String>,
    address: Option<String>,
    opening_hours: Option<String>,
    booking_enabled: bool,
    updated_at: OffsetDateTime,
}

impl From<SiteSettingsRow> for SiteSettingsRecord {
    fn from(row: SiteSettingsRow) -> Self {
        Self {
            business_name: row.business_name,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            address: row.address,
            opening_hours: row.opening_hours,
            booking_enabled: row.booking_enabled,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl SettingsRepo for PostgresRepositories {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        let row = sqlx::query_as::<_, SiteSettingsRow>(
            "SELECT business_name, contact_email, contact_phone, address, opening_hours, \
                    booking_enabled, updated_at \
             FROM site_settings WHERE id = TRUE",
        )
        .fetch_one(self.primary())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn upsert_site_settings(
        &self,
        settings: SiteSettingsRecord,
    ) -> Result<SiteSettingsRecord, RepoError> {
        let row = sqlx::query_as::<_, SiteSettingsRow>(
            "INSERT INTO site_settings (id, business_name, contact_email, contact_phone, address, \
                                        opening_hours, booking_enabled, updated_at) \
             VALUES (TRUE, $1, $2, $3, $4, $5, $6, now()) \
             ON CONFLICT (id) DO UPDATE SET \
                 business_name = EXCLUDED.business_name, \
                 contact_email = EXCLUDED.contact_email, \
                 contact_phone = EXCLUDED.contact_phone, \
                 address = EXCLUDED.address, \
                 opening_hours = EXCLUDED.opening_hours, \
                 booking_enabled = EXCLUDED.booking_enabled, \
                 updated_at = now() \
             RETURNING business_name, contact_email, contact_phone, address, opening_hours, \
                       booking_enabled, updated_at",
        )
        .bind(settings.business_name)
        .bind(settings.contact_email)
        .bind(settings.contact_phone)
        .bind(settings.address)
        .bind(settings.opening_hours)
        .bind(settings.booking_enabled)
        .fetch_one(self.primary())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateInquiryParams, InquiriesRepo, RepoError},
    domain::{
        entities::InquiryRecord,
        types::{InquiryStatus, InquiryUrgency},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const INQUIRY_COLUMNS: &str = "id, name, email, phone, service, urgency, message, status, \
    response, responded_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct InquiryRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    service: Option<String>,
    urgency: InquiryUrgency,
    message: String,
    status: InquiryStatus,
    response: Option<String>,
    responded_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<InquiryRow> for InquiryRecord {
    fn from(row: InquiryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            service: row.service,
            urgency: row.urgency,
            message: row.message,
            status: row.status,
            response: row.response,
            responded_at: row.responded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl InquiriesRepo for PostgresRepositories {
    async fn create_inquiry(
        &self,
        params: CreateInquiryParams,
    ) -> Result<InquiryRecord, RepoError> {
        let sql = format!(
            "INSERT INTO inquiries (id, name, email, phone, service, urgency, message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {INQUIRY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InquiryRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.name)
            .bind(params.email)
            .bind(params.phone)
            .bind(params.service)
            .bind(params.urgency)
            .bind(params.message)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn list_inquiries(
        &self,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<InquiryRecord>, RepoError> {
        // Most urgent first, then oldest first within an urgency.
        let sql = format!(
            "SELECT {INQUIRY_COLUMNS} FROM inquiries \
             WHERE ($1::inquiry_status IS NULL OR status = $1) \
             ORDER BY urgency DESC, created_at ASC"
        );
        let rows = sqlx::query_as::<_, InquiryRow>(&sql)
            .bind(status)
            .fetch_all(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_inquiry(&self, id: Uuid) -> Result<Option<InquiryRecord>, RepoError> {
        let sql = format!("SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE id = $1");
        let row = sqlx::query_as::<_, InquiryRow>(&sql)
            .bind(id)
            .fetch_optional(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn update_inquiry_status(
        &self,
        id: Uuid,
        status: InquiryStatus,
    ) -> Result<InquiryRecord, RepoError> {
        let sql = format!(
            "UPDATE inquiries SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {INQUIRY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InquiryRow>(&sql)
            .bind(id)
            .bind(status)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn record_inquiry_response(
        &self,
        id: Uuid,
        response: String,
        status: InquiryStatus,
        responded_at: OffsetDateTime,
    ) -> Result<InquiryRecord, RepoError> {
        let sql = format!(
            "UPDATE inquiries SET response = $2, status = $3, responded_at = $4, \
             updated_at = now() WHERE id = $1 RETURNING {INQUIRY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InquiryRow>(&sql)
            .bind(id)
            .bind(response)
            .bind(status)
            .bind(responded_at)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}

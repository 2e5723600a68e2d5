use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    application::repos::{AppointmentsRepo, CreateAppointmentParams, RepoError},
    domain::{
        entities::AppointmentRecord,
        types::{AppointmentStatus, AppointmentType},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const APPOINTMENT_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, service, \
    device_type, device_model, issue_description, preferred_date, preferred_time, \
    appointment_type, status, notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    service: String,
    device_type: Option<String>,
    device_model: Option<String>,
    issue_description: Option<String>,
    preferred_date: Date,
    preferred_time: Option<String>,
    appointment_type: AppointmentType,
    status: AppointmentStatus,
    notes: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<AppointmentRow> for AppointmentRecord {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            service: row.service,
            device_type: row.device_type,
            device_model: row.device_model,
            issue_description: row.issue_description,
            preferred_date: row.preferred_date,
            preferred_time: row.preferred_time,
            appointment_type: row.appointment_type,
            status: row.status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AppointmentsRepo for PostgresRepositories {
    async fn create_appointment(
        &self,
        params: CreateAppointmentParams,
    ) -> Result<AppointmentRecord, RepoError> {
        let sql = format!(
            "INSERT INTO appointments (id, customer_name, customer_email, customer_phone, \
             service, device_type, device_model, issue_description, preferred_date, \
             preferred_time, appointment_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {APPOINTMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.customer_name)
            .bind(params.customer_email)
            .bind(params.customer_phone)
            .bind(params.service)
            .bind(params.device_type)
            .bind(params.device_model)
            .bind(params.issue_description)
            .bind(params.preferred_date)
            .bind(params.preferred_time)
            .bind(params.appointment_type)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn list_appointments(
        &self,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, RepoError> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE ($1::appointment_status IS NULL OR status = $1) \
             ORDER BY preferred_date ASC, created_at ASC"
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(status)
            .fetch_all(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<AppointmentRecord>, RepoError> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .fetch_optional(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, RepoError> {
        let sql = format!(
            "UPDATE appointments SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {APPOINTMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .bind(status)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_appointment_notes(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<AppointmentRecord, RepoError> {
        let sql = format!(
            "UPDATE appointments SET notes = $2, updated_at = now() WHERE id = $1 \
             RETURNING {APPOINTMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .bind(notes)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}

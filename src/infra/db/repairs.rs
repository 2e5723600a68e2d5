use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateRepairRequestParams, RepairRequestWithCustomer, RepairsRepo, RepoError,
        UpsertCustomerParams,
    },
    domain::{
        entities::{CustomerRecord, RepairRequestRecord},
        types::RepairStatus,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const REPAIR_COLUMNS: &str =
    "id, customer_id, device_type, issue_description, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    created_at: OffsetDateTime,
}

impl From<CustomerRow> for CustomerRecord {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RepairRequestRow {
    id: Uuid,
    customer_id: Uuid,
    device_type: String,
    issue_description: String,
    status: RepairStatus,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<RepairRequestRow> for RepairRequestRecord {
    fn from(row: RepairRequestRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            device_type: row.device_type,
            issue_description: row.issue_description,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RepairListRow {
    #[sqlx(flatten)]
    request: RepairRequestRow,
    customer_name: String,
    customer_email: String,
}

#[async_trait]
impl RepairsRepo for PostgresRepositories {
    async fn upsert_customer(
        &self,
        params: UpsertCustomerParams,
    ) -> Result<CustomerRecord, RepoError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "INSERT INTO customers (id, name, email, phone) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (email) DO UPDATE \
             SET name = EXCLUDED.name, phone = COALESCE(EXCLUDED.phone, customers.phone) \
             RETURNING id, name, email, phone, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.name)
        .bind(params.email)
        .bind(params.phone)
        .fetch_one(self.primary())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn create_repair_request(
        &self,
        params: CreateRepairRequestParams,
    ) -> Result<RepairRequestRecord, RepoError> {
        let sql = format!(
            "INSERT INTO repair_requests (id, customer_id, device_type, issue_description) \
             VALUES ($1, $2, $3, $4) RETURNING {REPAIR_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RepairRequestRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(params.customer_id)
        .bind(params.device_type)
        .bind(params.issue_description)
        .fetch_one(self.primary())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn list_repair_requests(
        &self,
        status: Option<RepairStatus>,
    ) -> Result<Vec<RepairRequestWithCustomer>, RepoError> {
        let rows = sqlx::query_as::<_, RepairListRow>(
            "SELECT r.id, r.customer_id, r.device_type, r.issue_description, r.status, \
                    r.created_at, r.updated_at, c.name AS customer_name, c.email AS customer_email \
             FROM repair_requests r \
             INNER JOIN customers c ON c.id = r.customer_id \
             WHERE ($1::repair_status IS NULL OR r.status = $1) \
             ORDER BY r.created_at DESC",
        )
        .bind(status)
        .fetch_all(self.primary())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| RepairRequestWithCustomer {
                request: row.request.into(),
                customer_name: row.customer_name,
                customer_email: row.customer_email,
            })
            .collect())
    }

    async fn find_repair_request(
        &self,
        id: Uuid,
    ) -> Result<Option<RepairRequestRecord>, RepoError> {
        let sql = format!("SELECT {REPAIR_COLUMNS} FROM repair_requests WHERE id = $1");
        let row = sqlx::query_as::<_, RepairRequestRow>(&sql)
        .bind(id)
        .fetch_optional(self.primary())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn update_repair_status(
        &self,
        id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRecord, RepoError> {
        let sql = format!(
            "UPDATE repair_requests SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {REPAIR_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RepairRequestRow>(&sql)
        .bind(id)
        .bind(status)
        .fetch_one(self.primary())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}

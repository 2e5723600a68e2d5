use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{AdminsRepo, CreateAdminParams, RepoError},
    domain::{entities::AdminRecord, types::AdminRole},
};

use super::{PostgresRepositories, map_sqlx_error};

const ADMIN_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, last_login_at, created_at";

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: AdminRole,
    is_active: bool,
    last_login_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<AdminRow> for AdminRecord {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AdminsRepo for PostgresRepositories {
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminRecord>, RepoError> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE username = $1");
        let row = sqlx::query_as::<_, AdminRow>(&sql)
            .bind(username)
            .fetch_optional(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_admin(&self, id: Uuid) -> Result<Option<AdminRecord>, RepoError> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1");
        let row = sqlx::query_as::<_, AdminRow>(&sql)
            .bind(id)
            .fetch_optional(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn create_admin(&self, params: CreateAdminParams) -> Result<AdminRecord, RepoError> {
        let sql = format!(
            "INSERT INTO admins (id, username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ADMIN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AdminRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.username)
            .bind(params.email)
            .bind(params.password_hash)
            .bind(params.role)
            .fetch_one(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError> {
        sqlx::query("UPDATE admins SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.primary())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

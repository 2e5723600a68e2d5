use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::domain::types::AdminRole;

/// Command-line arguments for the Shopfront binary.
#[derive(Debug, Parser)]
#[command(name = "shopfront", version, about = "Shopfront storefront API server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SHOPFRONT_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub secrets: SecretOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API (default).
    Serve(Box<ServeArgs>),
    /// Create a back-office account.
    #[command(name = "create-admin")]
    CreateAdmin(CreateAdminArgs),
    /// Apply pending database migrations and exit.
    Migrate,
}

/// Connection strings; read from the conventional environment variables too.
#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Pooled database URL used for most reads.
    #[arg(long = "database-url", env = "DATABASE_URL", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Primary database URL for writes and read-after-write; defaults to the pooled URL.
    #[arg(
        long = "database-primary-url",
        env = "DATABASE_PRIMARY_URL",
        value_name = "URL",
        global = true
    )]
    pub database_primary_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SecretOverrides {
    /// HMAC secret for admin session tokens.
    #[arg(
        long = "jwt-secret",
        env = "JWT_SECRET",
        value_name = "SECRET",
        hide_env_values = true,
        global = true
    )]
    pub jwt_secret: Option<String>,

    /// Static bearer token accepted for admin routes.
    #[arg(
        long = "admin-token",
        env = "ADMIN_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub admin_token: Option<String>,

    /// Token required by `POST /api/revalidate`.
    #[arg(
        long = "revalidate-token",
        env = "REVALIDATE_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub revalidate_token: Option<String>,

    /// Redis URL for the object cache; in-process memory is used when unset.
    #[arg(long = "redis-url", env = "REDIS_URL", value_name = "URL", global = true)]
    pub redis_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the pooled database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the primary database pool size.
    #[arg(long = "database-primary-max-connections", value_name = "COUNT")]
    pub database_primary_max_connections: Option<u32>,

    /// Override the object cache TTL.
    #[arg(long = "cache-default-ttl-ms", value_name = "MILLIS")]
    pub cache_default_ttl_ms: Option<u64>,

    /// Override how many times a soft delete is re-checked.
    #[arg(long = "delete-polling-attempts", value_name = "COUNT")]
    pub delete_polling_attempts: Option<u32>,

    /// Override the pause between soft-delete checks.
    #[arg(long = "delete-polling-delay-ms", value_name = "MILLIS")]
    pub delete_polling_delay_ms: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateAdminArgs {
    /// Login name for the new account.
    #[arg(long, value_name = "NAME")]
    pub username: String,

    /// Contact address for the new account.
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Initial password; prefer the environment variable over the flag.
    #[arg(
        long,
        env = "SHOPFRONT_ADMIN_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true
    )]
    pub password: String,

    /// Account role (owner|editor).
    #[arg(long, default_value = "owner", value_parser = parse_role)]
    pub role: AdminRole,
}

fn parse_role(value: &str) -> Result<AdminRole, String> {
    AdminRole::try_from(value).map_err(|()| format!("unknown role `{value}` (owner|editor)"))
}

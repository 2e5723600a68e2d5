//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{
    CliArgs, Command, CreateAdminArgs, DatabaseOverride, SecretOverrides, ServeArgs,
    ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "shopfront";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_PRIMARY_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_CACHE_TTL_MS: u64 = 60_000;
const DEFAULT_CACHE_NAMESPACE: &str = "shopfront";
const DEFAULT_REDIS_TIMEOUT_MS: u64 = 250;
const DEFAULT_RESPONSE_CACHE_LIMIT: u32 = 256;
const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;
const DEFAULT_DELETE_POLL_ATTEMPTS: u32 = 5;
const DEFAULT_DELETE_POLL_DELAY_MS: u64 = 200;
const MIN_JWT_SECRET_LEN: usize = 16;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
    pub delete_polling: DeletePollingSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    /// Falls back to `url` when unset.
    pub primary_url: Option<String>,
    pub max_connections: NonZeroU32,
    pub primary_max_connections: NonZeroU32,
}

impl DatabaseSettings {
    pub fn primary_url(&self) -> Option<&str> {
        self.primary_url.as_deref().or(self.url.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub default_ttl: Duration,
    pub namespace: String,
    pub redis_timeout: Duration,
    pub enable_response_cache: bool,
    pub response_limit: NonZeroU32,
    pub response_ttl: Duration,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub admin_token: Option<String>,
    pub revalidate_token: Option<String>,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field(
                "jwt_secret",
                &self.jwt_secret.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "revalidate_token",
                &self.revalidate_token.as_ref().map(|_| "<redacted>"),
            )
            .field("session_ttl", &self.session_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeletePollingSettings {
    pub attempts: NonZeroU32,
    pub delay: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SHOPFRONT").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_database_override(&cli.database);
    raw.apply_secret_overrides(&cli.secrets);
    if let Some(Command::Serve(args)) = cli.command.as_ref() {
        raw.apply_serve_overrides(&args.overrides);
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    auth: RawAuthSettings,
    delete_polling: RawDeletePollingSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(max) = overrides.database_primary_max_connections {
            self.database.primary_max_connections = Some(max);
        }
        if let Some(ttl) = overrides.cache_default_ttl_ms {
            self.cache.default_ttl_ms = Some(ttl);
        }
        if let Some(attempts) = overrides.delete_polling_attempts {
            self.delete_polling.attempts = Some(attempts);
        }
        if let Some(delay) = overrides.delete_polling_delay_ms {
            self.delete_polling.delay_ms = Some(delay);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(url) = overrides.database_primary_url.as_ref() {
            self.database.primary_url = Some(url.clone());
        }
    }

    fn apply_secret_overrides(&mut self, overrides: &SecretOverrides) {
        if let Some(secret) = overrides.jwt_secret.as_ref() {
            self.auth.jwt_secret = Some(secret.clone());
        }
        if let Some(token) = overrides.admin_token.as_ref() {
            self.auth.admin_token = Some(token.clone());
        }
        if let Some(token) = overrides.revalidate_token.as_ref() {
            self.auth.revalidate_token = Some(token.clone());
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            auth,
            delete_polling,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            auth: build_auth_settings(auth)?,
            delete_polling: build_delete_polling_settings(delete_polling)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;
    let primary_max_connections = non_zero_u32(
        database
            .primary_max_connections
            .unwrap_or(DEFAULT_DB_PRIMARY_MAX_CONNECTIONS)
            .into(),
        "database.primary_max_connections",
    )?;

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        primary_url: non_blank(database.primary_url),
        max_connections,
        primary_max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_ms = cache.default_ttl_ms.unwrap_or(DEFAULT_CACHE_TTL_MS);
    if ttl_ms == 0 {
        return Err(LoadError::invalid(
            "cache.default_ttl_ms",
            "must be greater than zero",
        ));
    }

    let timeout_ms = cache.redis_timeout_ms.unwrap_or(DEFAULT_REDIS_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.redis_timeout_ms",
            "must be greater than zero",
        ));
    }

    let namespace =
        non_blank(cache.namespace).unwrap_or_else(|| DEFAULT_CACHE_NAMESPACE.to_string());
    if namespace.contains(['*', '?', '[', ']', ' ']) {
        return Err(LoadError::invalid(
            "cache.namespace",
            "must not contain glob characters or spaces",
        ));
    }

    let response_ttl_ms = cache.response_ttl_ms.unwrap_or(ttl_ms);
    if response_ttl_ms == 0 {
        return Err(LoadError::invalid(
            "cache.response_ttl_ms",
            "must be greater than zero",
        ));
    }

    let response_limit = non_zero_u32(
        cache
            .response_limit
            .unwrap_or(DEFAULT_RESPONSE_CACHE_LIMIT)
            .into(),
        "cache.response_limit",
    )?;

    Ok(CacheSettings {
        redis_url: non_blank(cache.redis_url),
        default_ttl: Duration::from_millis(ttl_ms),
        namespace,
        redis_timeout: Duration::from_millis(timeout_ms),
        enable_response_cache: cache.enable_response_cache.unwrap_or(true),
        response_limit,
        response_ttl: Duration::from_millis(response_ttl_ms),
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let jwt_secret = non_blank(auth.jwt_secret);
    if jwt_secret
        .as_ref()
        .is_some_and(|secret| secret.len() < MIN_JWT_SECRET_LEN)
    {
        return Err(LoadError::invalid(
            "auth.jwt_secret",
            format!("must be at least {MIN_JWT_SECRET_LEN} characters"),
        ));
    }

    let ttl_secs = auth.session_ttl_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "auth.session_ttl_seconds",
            "must be greater than zero",
        ));
    }

    Ok(AuthSettings {
        jwt_secret,
        admin_token: non_blank(auth.admin_token),
        revalidate_token: non_blank(auth.revalidate_token),
        session_ttl: Duration::from_secs(ttl_secs),
        cookie_secure: auth.cookie_secure.unwrap_or(false),
    })
}

fn build_delete_polling_settings(
    polling: RawDeletePollingSettings,
) -> Result<DeletePollingSettings, LoadError> {
    let attempts = non_zero_u32(
        polling
            .attempts
            .unwrap_or(DEFAULT_DELETE_POLL_ATTEMPTS)
            .into(),
        "delete_polling.attempts",
    )?;

    Ok(DeletePollingSettings {
        attempts,
        delay: Duration::from_millis(polling.delay_ms.unwrap_or(DEFAULT_DELETE_POLL_DELAY_MS)),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    primary_url: Option<String>,
    max_connections: Option<u32>,
    primary_max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    redis_url: Option<String>,
    default_ttl_ms: Option<u64>,
    namespace: Option<String>,
    redis_timeout_ms: Option<u64>,
    enable_response_cache: Option<bool>,
    response_limit: Option<u32>,
    response_ttl_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    jwt_secret: Option<String>,
    admin_token: Option<String>,
    revalidate_token: Option<String>,
    session_ttl_seconds: Option<u64>,
    cookie_secure: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDeletePollingSettings {
    attempts: Option<u32>,
    delay_ms: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;
    use crate::domain::types::AdminRole;

    /// Sets environment variables for the lifetime of the guard.
    struct EnvGuard(Vec<&'static str>);

    impl EnvGuard {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (key, value) in vars {
                // SAFETY: every test touching the environment is `#[serial]`.
                unsafe { std::env::set_var(key, value) };
            }
            Self(vars.iter().map(|(key, _)| *key).collect())
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in &self.0 {
                // SAFETY: see `EnvGuard::set`.
                unsafe { std::env::remove_var(key) };
            }
        }
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.cache.default_ttl, Duration::from_secs(60));
        assert_eq!(settings.cache.namespace, "shopfront");
        assert_eq!(settings.cache.response_ttl, settings.cache.default_ttl);
        assert_eq!(settings.delete_polling.attempts.get(), 5);
        assert_eq!(settings.delete_polling.delay, Duration::from_millis(200));
        assert_eq!(settings.auth.session_ttl, Duration::from_secs(8 * 3600));
        assert!(settings.cache.redis_url.is_none());
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());
        raw.delete_polling.attempts = Some(3);

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            delete_polling_attempts: Some(9),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert_eq!(settings.delete_polling.attempts.get(), 9);
    }

    #[test]
    fn secrets_from_cli_replace_file_values() {
        let mut raw = RawSettings::default();
        raw.auth.jwt_secret = Some("from-the-config-file".to_string());

        raw.apply_secret_overrides(&SecretOverrides {
            jwt_secret: Some("from-the-environment".to_string()),
            redis_url: Some("redis://cache:6379".to_string()),
            ..Default::default()
        });
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(
            settings.auth.jwt_secret.as_deref(),
            Some("from-the-environment")
        );
        assert_eq!(
            settings.cache.redis_url.as_deref(),
            Some("redis://cache:6379")
        );
    }

    #[test]
    fn primary_url_falls_back_to_pooled_url() {
        let mut raw = RawSettings::default();
        raw.apply_database_override(&DatabaseOverride {
            database_url: Some("postgres://pooler/shop".to_string()),
            database_primary_url: None,
        });
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(
            settings.database.primary_url(),
            Some("postgres://pooler/shop")
        );

        let mut raw = RawSettings::default();
        raw.database.url = Some("postgres://pooler/shop".to_string());
        raw.database.primary_url = Some("postgres://primary/shop".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(
            settings.database.primary_url(),
            Some("postgres://primary/shop")
        );
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let mut raw = RawSettings::default();
        raw.cache.redis_url = Some("   ".to_string());
        raw.auth.admin_token = Some(String::new());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.cache.redis_url.is_none());
        assert!(settings.auth.admin_token.is_none());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut raw = RawSettings::default();
        raw.auth.jwt_secret = Some("short".to_string());
        let err = Settings::from_raw(raw).expect_err("secret too short");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "auth.jwt_secret",
                ..
            }
        ));
    }

    #[test]
    fn zero_polling_attempts_are_rejected() {
        let mut raw = RawSettings::default();
        raw.delete_polling.attempts = Some(0);
        let err = Settings::from_raw(raw).expect_err("zero attempts");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "delete_polling.attempts",
                ..
            }
        ));
    }

    #[test]
    fn response_ttl_can_differ_from_object_ttl() {
        let mut raw = RawSettings::default();
        raw.cache.response_ttl_ms = Some(5_000);
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.cache.response_ttl, Duration::from_secs(5));
        assert_eq!(settings.cache.default_ttl, Duration::from_secs(60));

        let mut raw = RawSettings::default();
        raw.cache.response_ttl_ms = Some(0);
        let err = Settings::from_raw(raw).expect_err("zero ttl");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "cache.response_ttl_ms",
                ..
            }
        ));
    }

    #[test]
    fn glob_characters_in_namespace_are_rejected() {
        let mut raw = RawSettings::default();
        raw.cache.namespace = Some("shop*".to_string());
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let mut raw = RawSettings::default();
        raw.auth.jwt_secret = Some("a-very-secret-signing-key".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        let rendered = format!("{:?}", settings.auth);
        assert!(!rendered.contains("a-very-secret-signing-key"));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        raw.apply_serve_overrides(&ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        });
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["shopfront"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "shopfront",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--database-url",
            "postgres://override",
        ]);

        assert_eq!(
            args.database.database_url.as_deref(),
            Some("postgres://override")
        );
        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_create_admin_arguments() {
        let args = CliArgs::parse_from([
            "shopfront",
            "create-admin",
            "--username",
            "ana",
            "--email",
            "ana@example.com",
            "--password",
            "correct horse battery",
            "--role",
            "editor",
        ]);

        match args.command.expect("create-admin command") {
            Command::CreateAdmin(create) => {
                assert_eq!(create.username, "ana");
                assert_eq!(create.email, "ana@example.com");
                assert_eq!(create.role, AdminRole::Editor);
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn unknown_role_is_a_parse_error() {
        let result = CliArgs::try_parse_from([
            "shopfront",
            "create-admin",
            "--username",
            "ana",
            "--email",
            "ana@example.com",
            "--password",
            "pw",
            "--role",
            "root",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_migrate_command() {
        let args = CliArgs::parse_from(["shopfront", "migrate"]);
        assert!(matches!(args.command, Some(Command::Migrate)));
    }

    #[test]
    #[serial]
    fn environment_beats_file_and_cli_beats_environment() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config file");
        writeln!(
            file,
            "[server]\nport = 4000\n\n[cache]\ndefault_ttl_ms = 1000\nnamespace = \"from-file\""
        )
        .expect("write config");
        let path = file.path().to_str().expect("utf-8 path").to_string();

        let _env = EnvGuard::set(&[
            ("SHOPFRONT__SERVER__PORT", "4100"),
            ("SHOPFRONT__CACHE__DEFAULT_TTL_MS", "2000"),
        ]);

        let args = CliArgs::parse_from(["shopfront", "--config-file", &path, "serve"]);
        let settings = load(&args).expect("valid settings");
        assert_eq!(settings.cache.namespace, "from-file");
        assert_eq!(settings.server.addr.port(), 4100);
        assert_eq!(settings.cache.default_ttl, Duration::from_millis(2000));

        let args = CliArgs::parse_from([
            "shopfront",
            "--config-file",
            &path,
            "serve",
            "--cache-default-ttl-ms",
            "3000",
        ]);
        let settings = load(&args).expect("valid settings");
        assert_eq!(settings.server.addr.port(), 4100);
        assert_eq!(settings.cache.default_ttl, Duration::from_millis(3000));
    }
}

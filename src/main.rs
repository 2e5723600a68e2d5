use std::{future::IntoFuture, process, sync::Arc};

use shopfront::{
    application::{
        appointments::AppointmentService,
        auth::{AdminAuthService, AuthConfig, CreateAdminCommand},
        blog::BlogService,
        error::AppError,
        inquiries::InquiryService,
        invalidation::ContentInvalidator,
        products::{DeletePolicy, ProductService},
        repairs::RepairService,
        repos::{
            AdminsRepo, AppointmentsRepo, BlogRepo, BlogWriteRepo, HealthRepo, InquiriesRepo,
            ProductsRepo, ProductsWriteRepo, RepairsRepo, SettingsRepo,
        },
        settings::SettingsService,
    },
    cache::{Cache, CacheConfig, NoopRevalidator, ResponseCache, Revalidator},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState, SessionConfig},
        telemetry,
    },
};
use tokio::{signal, sync::watch, task::JoinError};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateAdmin(args) => run_create_admin(settings, args).await,
        config::Command::Migrate => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings)?;
    serve_http(&settings, state).await
}

async fn run_create_admin(
    settings: config::Settings,
    args: config::CreateAdminArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let admins: Arc<dyn AdminsRepo> = repositories;
    let auth = AdminAuthService::new(admins, AuthConfig::from(&settings.auth));

    let profile = auth
        .create_admin(CreateAdminCommand {
            username: args.username,
            email: args.email,
            password: args.password,
            role: args.role,
        })
        .await?;
    info!(
        target = "shopfront::create_admin",
        admin_id = %profile.id,
        username = %profile.username,
        role = profile.role.as_str(),
        "admin created"
    );
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = PostgresRepositories::connect_from_settings(&settings.database).await?;
    PostgresRepositories::run_migrations(repositories.primary())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "shopfront::migrate", "migrations applied");
    Ok(())
}

/// Connects both pools and applies pending migrations on the primary.
async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let repositories = PostgresRepositories::connect_from_settings(&settings.database).await?;
    PostgresRepositories::run_migrations(repositories.primary())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    Ok(Arc::new(repositories))
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let products_repo: Arc<dyn ProductsRepo> = repositories.clone();
    let products_write_repo: Arc<dyn ProductsWriteRepo> = repositories.clone();
    let blog_repo: Arc<dyn BlogRepo> = repositories.clone();
    let blog_write_repo: Arc<dyn BlogWriteRepo> = repositories.clone();
    let appointments_repo: Arc<dyn AppointmentsRepo> = repositories.clone();
    let inquiries_repo: Arc<dyn InquiriesRepo> = repositories.clone();
    let repairs_repo: Arc<dyn RepairsRepo> = repositories.clone();
    let admins_repo: Arc<dyn AdminsRepo> = repositories.clone();
    let settings_repo: Arc<dyn SettingsRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Cache::from_config(&cache_config).map_err(InfraError::from)?;
    info!(
        target = "shopfront::cache",
        backend = cache.backend_name(),
        ttl_ms = cache.default_ttl().as_millis() as u64,
        "object cache ready"
    );

    let response_cache = cache_config
        .enable_response_cache
        .then(|| ResponseCache::new(cache_config.response_limit, cache_config.response_ttl));
    let revalidator: Arc<dyn Revalidator> = match response_cache.clone() {
        Some(cache) => Arc::new(cache),
        None => Arc::new(NoopRevalidator),
    };
    let invalidator = ContentInvalidator::new(cache.clone(), revalidator);

    if settings.auth.jwt_secret.is_none() {
        warn!(
            target = "shopfront::auth",
            legacy_token = settings.auth.admin_token.is_some(),
            "JWT_SECRET is not set; admin login is disabled"
        );
    }

    Ok(HttpState {
        products: Arc::new(ProductService::new(
            products_repo,
            products_write_repo,
            cache.clone(),
            invalidator.clone(),
            DeletePolicy::from(settings.delete_polling),
        )),
        blog: Arc::new(BlogService::new(
            blog_repo,
            blog_write_repo,
            cache,
            invalidator.clone(),
        )),
        appointments: Arc::new(AppointmentService::new(
            appointments_repo,
            settings_repo.clone(),
        )),
        inquiries: Arc::new(InquiryService::new(inquiries_repo)),
        repairs: Arc::new(RepairService::new(repairs_repo)),
        settings: Arc::new(SettingsService::new(settings_repo, invalidator.clone())),
        auth: Arc::new(AdminAuthService::new(
            admins_repo,
            AuthConfig::from(&settings.auth),
        )),
        invalidator,
        health: health_repo,
        response_cache,
        session: SessionConfig {
            secure: settings.auth.cookie_secure,
            ttl: settings.auth.session_ttl,
        },
        revalidate_token: settings.auth.revalidate_token.clone(),
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "shopfront::http",
        addr = %settings.server.addr,
        "listening"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            let _ = shutdown_rx.changed().await;
        },
    );
    let mut handle = tokio::spawn(server.into_future());

    tokio::select! {
        result = &mut handle => return server_result(result),
        _ = shutdown_signal() => {}
    }
    let _ = shutdown_tx.send(true);

    // In-flight requests get the configured grace period to finish.
    let grace = settings.server.graceful_shutdown;
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(result) => server_result(result),
        Err(_) => {
            warn!(
                target = "shopfront::http",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out"
            );
            handle.abort();
            Ok(())
        }
    }
}

fn server_result(result: Result<std::io::Result<()>, JoinError>) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!(target = "shopfront::http", "shutdown signal received");
}

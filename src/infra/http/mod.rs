mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
mod public;

pub use admin::build_admin_router;
pub use auth::{SESSION_COOKIE, SessionConfig};
pub use public::REVALIDATE_TOKEN_HEADER;

use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::{
    application::{
        appointments::AppointmentService, auth::AdminAuthService, blog::BlogService,
        inquiries::InquiryService, invalidation::ContentInvalidator, products::ProductService,
        repairs::RepairService, repos::HealthRepo, settings::SettingsService,
    },
    cache::{ResponseCache, response_cache_layer},
};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub products: Arc<ProductService>,
    pub blog: Arc<BlogService>,
    pub appointments: Arc<AppointmentService>,
    pub inquiries: Arc<InquiryService>,
    pub repairs: Arc<RepairService>,
    pub settings: Arc<SettingsService>,
    pub auth: Arc<AdminAuthService>,
    pub invalidator: ContentInvalidator,
    pub health: Arc<dyn HealthRepo>,
    /// `None` when response caching is disabled.
    pub response_cache: Option<ResponseCache>,
    pub session: SessionConfig,
    pub revalidate_token: Option<String>,
}

pub fn build_router(state: HttpState) -> Router {
    // Public reads, served from the response cache when enabled.
    let cached_routes = Router::new()
        .route("/api/products", get(public::list_products))
        .route("/api/products/{id}", get(public::get_product))
        .route("/api/blog", get(public::list_posts))
        .route("/api/blog/{slug}", get(public::get_post));

    let cached_routes = if let Some(cache) = state.response_cache.clone() {
        cached_routes.layer(from_fn_with_state(cache, response_cache_layer))
    } else {
        cached_routes
    };

    let uncached_routes = Router::new()
        .route("/api/appointments", post(public::book_appointment))
        .route("/api/inquiries", post(public::submit_inquiry))
        .route("/api/repair-requests", post(public::submit_repair))
        .route("/api/revalidate", post(public::revalidate))
        .route("/health", get(public::health));

    cached_routes
        .merge(uncached_routes)
        .merge(build_admin_router(state.clone()))
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}

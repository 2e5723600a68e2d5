use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    application::auth::AdminPrincipal,
    domain::types::{AppointmentStatus, BlogPostStatus, InquiryStatus, ProductStatus, RepairStatus},
};

use super::{
    HttpState, auth,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        AdminBlogListQuery, AdminProductListQuery, BlogCreateRequest, BlogPatchRequest,
        NotesRequest, ProductCreateRequest, ProductDeleteQuery, ProductPatchRequest,
        RespondRequest, SettingsPatchRequest, StatusFilterQuery, StatusRequest, StockRequest,
    },
};

pub fn build_admin_router(state: HttpState) -> Router<HttpState> {
    let protected = Router::new()
        .route("/api/admin/me", get(auth::me))
        .route(
            "/api/admin/products",
            get(list_products).post(create_product),
        )
        .route(
            "/api/admin/products/{id}",
            get(get_product)
                .patch(update_product)
                .delete(delete_product),
        )
        .route("/api/admin/products/{id}/restore", post(restore_product))
        .route("/api/admin/products/{id}/status", post(product_status))
        .route("/api/admin/products/{id}/stock", post(product_stock))
        .route("/api/admin/blog", get(list_posts).post(create_post))
        .route(
            "/api/admin/blog/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/api/admin/blog/{id}/status", post(post_status))
        .route("/api/admin/appointments", get(list_appointments))
        .route("/api/admin/appointments/{id}", get(get_appointment))
        .route(
            "/api/admin/appointments/{id}/status",
            post(appointment_status),
        )
        .route(
            "/api/admin/appointments/{id}/notes",
            patch(appointment_notes),
        )
        .route("/api/admin/inquiries", get(list_inquiries))
        .route("/api/admin/inquiries/{id}/status", post(inquiry_status))
        .route("/api/admin/inquiries/{id}/respond", post(respond_inquiry))
        .route("/api/admin/repair-requests", get(list_repairs))
        .route(
            "/api/admin/repair-requests/{id}/status",
            post(repair_status),
        )
        .route(
            "/api/admin/settings",
            get(get_settings).patch(patch_settings),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin));

    Router::new()
        .route("/api/admin/login", post(auth::login))
        .route("/api/admin/logout", post(auth::logout))
        .merge(protected)
}

/// -------- Products --------
async fn list_products(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<AdminProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .products
        .list_admin(query.status, query.include_deleted, &query.filter())
        .await?;
    Ok(Json(products))
}

async fn get_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.products.get_admin(id).await?))
}

async fn create_product(
    State(state): State<HttpState>,
    ApiJson(payload): ApiJson<ProductCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.products.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ProductPatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = state.products.get_admin(id).await?;
    let product = state.products.update(id, payload.apply(current)).await?;
    Ok(Json(product))
}

/// Soft delete by default; `?hard=true` removes the row.
async fn delete_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ProductDeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.hard {
        state.products.hard_delete(id).await?;
        return Ok(Json(json!({ "deleted": true, "hard": true })));
    }
    let outcome = state.products.soft_delete(id).await?;
    Ok(Json(json!({
        "deleted": true,
        "hard": false,
        "product": outcome.product,
        "confirmed": outcome.confirmed,
        "attempts": outcome.attempts,
    })))
}

async fn restore_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.products.restore(id).await?))
}

async fn product_status(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusRequest<ProductStatus>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.products.set_status(id, payload.status).await?))
}

async fn product_stock(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .products
        .update_stock(id, payload.in_stock, payload.stock_quantity)
        .await?;
    Ok(Json(product))
}

/// -------- Blog --------
async fn list_posts(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<AdminBlogListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.blog.list_admin(query.status, &query.filter()).await?;
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.blog.get_admin(id).await?))
}

async fn create_post(
    State(state): State<HttpState>,
    Extension(principal): Extension<AdminPrincipal>,
    ApiJson(payload): ApiJson<BlogCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .blog
        .create(payload.into_command(&principal.username))
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<BlogPatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.blog.update(id, payload.into()).await?))
}

async fn post_status(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusRequest<BlogPostStatus>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.blog.set_status(id, payload.status).await?))
}

async fn delete_post(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.blog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// -------- Appointments --------
async fn list_appointments(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<StatusFilterQuery<AppointmentStatus>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.appointments.list(query.status).await?))
}

async fn get_appointment(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.appointments.get(id).await?))
}

async fn appointment_status(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusRequest<AppointmentStatus>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.appointments.set_status(id, payload.status).await?))
}

async fn appointment_notes(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<NotesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.appointments.set_notes(id, payload.notes).await?))
}

/// -------- Inquiries --------
async fn list_inquiries(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<StatusFilterQuery<InquiryStatus>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.inquiries.list(query.status).await?))
}

async fn inquiry_status(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusRequest<InquiryStatus>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.inquiries.set_status(id, payload.status).await?))
}

async fn respond_inquiry(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<RespondRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.inquiries.respond(id, payload.response).await?))
}

/// -------- Repairs --------
async fn list_repairs(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<StatusFilterQuery<RepairStatus>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.repairs.list(query.status).await?))
}

async fn repair_status(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusRequest<RepairStatus>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.repairs.set_status(id, payload.status).await?))
}

/// -------- Settings --------
async fn get_settings(State(state): State<HttpState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings.load().await?))
}

async fn patch_settings(
    State(state): State<HttpState>,
    Extension(principal): Extension<AdminPrincipal>,
    ApiJson(payload): ApiJson<SettingsPatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.require_settings_access()?;
    Ok(Json(state.settings.update(payload.into()).await?))
}

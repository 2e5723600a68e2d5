use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::{
    error::ErrorReport,
    repos::{BlogQueryFilter, ProductQueryFilter},
};

use super::{
    HttpState,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        AppointmentRequest, BlogListQuery, InquiryRequest, ProductListQuery, RepairRequest,
        RevalidateRequest, RevalidateResponse,
    },
};

pub const REVALIDATE_TOKEN_HEADER: &str = "x-revalidate-token";

pub async fn list_products(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ProductQueryFilter::from(query);
    let products = state.products.list_public(&filter).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<HttpState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.products.get_public(id).await?;
    Ok(Json(product))
}

pub async fn list_posts(
    State(state): State<HttpState>,
    ApiQuery(query): ApiQuery<BlogListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = BlogQueryFilter::from(query);
    let posts = state.blog.list_public(&filter).await?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<HttpState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.blog.get_public(&slug).await?;
    Ok(Json(post))
}

pub async fn book_appointment(
    State(state): State<HttpState>,
    ApiJson(payload): ApiJson<AppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let appointment = state.appointments.book(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn submit_inquiry(
    State(state): State<HttpState>,
    ApiJson(payload): ApiJson<InquiryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let inquiry = state.inquiries.submit(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}

pub async fn submit_repair(
    State(state): State<HttpState>,
    ApiJson(payload): ApiJson<RepairRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let intake = state.repairs.submit(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(intake)))
}

/// Drops cached responses for the given paths. Disabled unless a token is
/// configured.
pub async fn revalidate(
    State(state): State<HttpState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<RevalidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let provided = headers
        .get(REVALIDATE_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let authorised = state
        .revalidate_token
        .as_deref()
        .is_some_and(|expected| bool::from(expected.as_bytes().ct_eq(provided.as_bytes())));
    if !authorised {
        return Err(ApiError::unauthorized("Invalid revalidation token"));
    }

    let paths: Vec<String> = payload
        .paths
        .into_iter()
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .collect();
    if paths.is_empty() {
        return Err(ApiError::bad_request(
            "No paths to revalidate",
            Some("provide a non-empty `paths` array".to_string()),
        ));
    }
    if let Some(bad) = paths.iter().find(|path| !path.starts_with('/')) {
        return Err(ApiError::bad_request(
            "Paths must be absolute",
            Some(format!("`{bad}` does not start with `/`")),
        ));
    }

    state.invalidator.revalidate_paths(&paths).await;
    info!(
        target = "shopfront::http::revalidate",
        count = paths.len(),
        "paths revalidated on request"
    );

    Ok(Json(RevalidateResponse {
        revalidated: paths,
        now: (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64,
    }))
}

pub async fn health(State(state): State<HttpState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

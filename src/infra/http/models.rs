//! Request payloads and query strings for the JSON API.
//!
//! Required text fields default to empty strings so that a missing field is
//! reported by service validation as a 400 rather than rejected by the
//! extractor.

use serde::{Deserialize, Serialize};

use crate::{
    application::{
        appointments::BookAppointmentCommand,
        blog::{CreatePostCommand, UpdatePostCommand},
        inquiries::SubmitInquiryCommand,
        products::ProductCommand,
        repairs::SubmitRepairCommand,
        repos::{BlogQueryFilter, ProductQueryFilter},
        settings::UpdateSettingsCommand,
    },
    domain::{
        entities::{ProductRecord, Specifications},
        types::{AppointmentType, BlogPostStatus, InquiryUrgency, ProductStatus},
    },
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub in_stock: Option<bool>,
}

impl From<ProductListQuery> for ProductQueryFilter {
    fn from(query: ProductListQuery) -> Self {
        Self {
            category: query.category,
            brand: query.brand,
            search: query.search,
            in_stock: query.in_stock,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminProductListQuery {
    pub status: Option<ProductStatus>,
    pub include_deleted: bool,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub in_stock: Option<bool>,
}

impl AdminProductListQuery {
    pub fn filter(&self) -> ProductQueryFilter {
        ProductQueryFilter {
            category: self.category.clone(),
            brand: self.brand.clone(),
            search: self.search.clone(),
            in_stock: self.in_stock,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductDeleteQuery {
    pub hard: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductCreateRequest {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub category: String,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: Option<bool>,
    pub stock_quantity: i32,
    pub status: Option<ProductStatus>,
    pub specifications: Specifications,
}

impl From<ProductCreateRequest> for ProductCommand {
    fn from(request: ProductCreateRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price_cents: request.price_cents,
            category: request.category,
            brand: request.brand,
            sku: request.sku,
            image_url: request.image_url,
            in_stock: request.in_stock.unwrap_or(true),
            stock_quantity: request.stock_quantity,
            status: request.status.unwrap_or(ProductStatus::Active),
            specifications: request.specifications,
        }
    }
}

/// Absent fields keep the stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductPatchRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub specifications: Option<Specifications>,
}

impl ProductPatchRequest {
    pub fn apply(self, current: ProductRecord) -> ProductCommand {
        ProductCommand {
            name: self.name.unwrap_or(current.name),
            description: self.description.unwrap_or(current.description),
            price_cents: self.price_cents.unwrap_or(current.price_cents),
            category: self.category.unwrap_or(current.category),
            brand: self.brand.or(current.brand),
            sku: self.sku.or(current.sku),
            image_url: self.image_url.or(current.image_url),
            in_stock: current.in_stock,
            stock_quantity: current.stock_quantity,
            status: current.status,
            specifications: self.specifications.unwrap_or(current.specifications),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest<S> {
    pub status: S,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilterQuery<S> {
    pub status: Option<S>,
}

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub in_stock: bool,
    pub stock_quantity: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlogListQuery {
    pub search: Option<String>,
    pub author: Option<String>,
}

impl From<BlogListQuery> for BlogQueryFilter {
    fn from(query: BlogListQuery) -> Self {
        Self {
            search: query.search,
            author: query.author,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminBlogListQuery {
    pub status: Option<BlogPostStatus>,
    pub search: Option<String>,
    pub author: Option<String>,
}

impl AdminBlogListQuery {
    pub fn filter(&self) -> BlogQueryFilter {
        BlogQueryFilter {
            search: self.search.clone(),
            author: self.author.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlogCreateRequest {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    /// Defaults to the signed-in admin.
    pub author: Option<String>,
    pub status: Option<BlogPostStatus>,
}

impl BlogCreateRequest {
    pub fn into_command(self, fallback_author: &str) -> CreatePostCommand {
        CreatePostCommand {
            title: self.title,
            slug: self.slug,
            content: self.content,
            excerpt: self.excerpt,
            featured_image: self.featured_image,
            author: self
                .author
                .filter(|author| !author.trim().is_empty())
                .unwrap_or_else(|| fallback_author.to_string()),
            status: self.status.unwrap_or(BlogPostStatus::Draft),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlogPatchRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub author: Option<String>,
}

impl From<BlogPatchRequest> for UpdatePostCommand {
    fn from(request: BlogPatchRequest) -> Self {
        Self {
            title: request.title,
            slug: request.slug,
            content: request.content,
            excerpt: request.excerpt,
            featured_image: request.featured_image,
            author: request.author,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppointmentRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service: String,
    pub preferred_date: String,
    pub preferred_time: Option<String>,
    pub device_type: Option<String>,
    pub device_model: Option<String>,
    pub issue_description: Option<String>,
    pub appointment_type: Option<AppointmentType>,
}

impl From<AppointmentRequest> for BookAppointmentCommand {
    fn from(request: AppointmentRequest) -> Self {
        Self {
            customer_name: request.customer_name,
            customer_email: request.customer_email,
            customer_phone: request.customer_phone,
            service: request.service,
            preferred_date: request.preferred_date,
            preferred_time: request.preferred_time,
            device_type: request.device_type,
            device_model: request.device_model,
            issue_description: request.issue_description,
            appointment_type: request.appointment_type,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotesRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InquiryRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service: Option<String>,
    pub urgency: Option<InquiryUrgency>,
    pub message: String,
}

impl From<InquiryRequest> for SubmitInquiryCommand {
    fn from(request: InquiryRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            phone: request.phone,
            service: request.service,
            urgency: request.urgency,
            message: request.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RespondRequest {
    pub response: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepairRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub device_type: String,
    pub issue_description: String,
}

impl From<RepairRequest> for SubmitRepairCommand {
    fn from(request: RepairRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            phone: request.phone,
            device_type: request.device_type,
            issue_description: request.issue_description,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SettingsPatchRequest {
    pub business_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub opening_hours: Option<String>,
    pub booking_enabled: Option<bool>,
}

impl From<SettingsPatchRequest> for UpdateSettingsCommand {
    fn from(request: SettingsPatchRequest) -> Self {
        Self {
            business_name: request.business_name,
            contact_email: request.contact_email,
            contact_phone: request.contact_phone,
            address: request.address,
            opening_hours: request.opening_hours,
            booking_enabled: request.booking_enabled,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RevalidateRequest {
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: Vec<String>,
    pub now: i64,
}

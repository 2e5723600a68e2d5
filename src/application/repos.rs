//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::domain::entities::{
    AdminRecord, AppointmentRecord, BlogPostRecord, CustomerRecord, InquiryRecord, ProductRecord,
    RepairRequestRecord, SiteSettingsRecord, Specifications,
};
use crate::domain::types::{
    AdminRole, AppointmentStatus, AppointmentType, BlogPostStatus, InquiryStatus, InquiryUrgency,
    ProductStatus, RepairStatus,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which connection a read is routed to.
///
/// `Pooled` may lag behind recent writes; `Primary` always observes them.
/// Writes never take this parameter and always go to the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadConsistency {
    #[default]
    Pooled,
    Primary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductListScope {
    /// `is_active` and `status = active` only.
    Public,
    /// Everything, optionally narrowed by status and soft-delete flag.
    Admin {
        status: Option<ProductStatus>,
        include_deleted: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ProductQueryFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub in_stock: Option<bool>,
}

impl ProductQueryFilter {
    /// Trimmed, lower-cased, blanks dropped: equivalent filters compare equal.
    pub fn normalized(&self) -> Self {
        Self {
            category: normalize_term(self.category.as_deref()),
            brand: normalize_term(self.brand.as_deref()),
            search: normalize_term(self.search.as_deref()),
            in_stock: self.in_stock,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateProductParams {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub category: String,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub stock_quantity: i32,
    pub status: ProductStatus,
    pub specifications: Specifications,
}

#[derive(Debug, Clone)]
pub struct UpdateProductParams {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub category: String,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub specifications: Specifications,
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateStockParams {
    pub id: Uuid,
    pub in_stock: bool,
    pub stock_quantity: i32,
}

#[async_trait]
pub trait ProductsRepo: Send + Sync {
    async fn list_products(
        &self,
        consistency: ReadConsistency,
        scope: ProductListScope,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, RepoError>;

    async fn find_product(
        &self,
        consistency: ReadConsistency,
        id: Uuid,
    ) -> Result<Option<ProductRecord>, RepoError>;

    /// Number of products with `is_active = true`.
    async fn count_active(&self, consistency: ReadConsistency) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ProductsWriteRepo: Send + Sync {
    async fn create_product(&self, params: CreateProductParams) -> Result<ProductRecord, RepoError>;

    async fn update_product(&self, params: UpdateProductParams) -> Result<ProductRecord, RepoError>;

    async fn update_product_status(
        &self,
        id: Uuid,
        status: ProductStatus,
    ) -> Result<ProductRecord, RepoError>;

    async fn update_product_stock(
        &self,
        params: UpdateStockParams,
    ) -> Result<ProductRecord, RepoError>;

    async fn set_product_active(&self, id: Uuid, active: bool) -> Result<ProductRecord, RepoError>;

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogListScope {
    Public,
    Admin { status: Option<BlogPostStatus> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct BlogQueryFilter {
    pub search: Option<String>,
    pub author: Option<String>,
}

impl BlogQueryFilter {
    pub fn normalized(&self) -> Self {
        Self {
            search: normalize_term(self.search.as_deref()),
            author: normalize_term(self.author.as_deref()),
        }
    }
}

fn normalize_term(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone)]
pub struct CreateBlogPostParams {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub author: String,
    pub status: BlogPostStatus,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct UpdateBlogPostParams {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub author: String,
}

#[async_trait]
pub trait BlogRepo: Send + Sync {
    async fn list_posts(
        &self,
        consistency: ReadConsistency,
        scope: BlogListScope,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, RepoError>;

    async fn find_post_by_slug(
        &self,
        consistency: ReadConsistency,
        slug: &str,
    ) -> Result<Option<BlogPostRecord>, RepoError>;

    async fn find_post(
        &self,
        consistency: ReadConsistency,
        id: Uuid,
    ) -> Result<Option<BlogPostRecord>, RepoError>;
}

#[async_trait]
pub trait BlogWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreateBlogPostParams) -> Result<BlogPostRecord, RepoError>;

    async fn update_post(&self, params: UpdateBlogPostParams) -> Result<BlogPostRecord, RepoError>;

    async fn update_post_status(
        &self,
        id: Uuid,
        status: BlogPostStatus,
        published_at: Option<OffsetDateTime>,
    ) -> Result<BlogPostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateAppointmentParams {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service: String,
    pub device_type: Option<String>,
    pub device_model: Option<String>,
    pub issue_description: Option<String>,
    pub preferred_date: Date,
    pub preferred_time: Option<String>,
    pub appointment_type: AppointmentType,
}

#[async_trait]
pub trait AppointmentsRepo: Send + Sync {
    async fn create_appointment(
        &self,
        params: CreateAppointmentParams,
    ) -> Result<AppointmentRecord, RepoError>;

    async fn list_appointments(
        &self,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, RepoError>;

    async fn find_appointment(&self, id: Uuid) -> Result<Option<AppointmentRecord>, RepoError>;

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, RepoError>;

    async fn update_appointment_notes(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<AppointmentRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateInquiryParams {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service: Option<String>,
    pub urgency: InquiryUrgency,
    pub message: String,
}

#[async_trait]
pub trait InquiriesRepo: Send + Sync {
    async fn create_inquiry(&self, params: CreateInquiryParams) -> Result<InquiryRecord, RepoError>;

    async fn list_inquiries(
        &self,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<InquiryRecord>, RepoError>;

    async fn find_inquiry(&self, id: Uuid) -> Result<Option<InquiryRecord>, RepoError>;

    async fn update_inquiry_status(
        &self,
        id: Uuid,
        status: InquiryStatus,
    ) -> Result<InquiryRecord, RepoError>;

    async fn record_inquiry_response(
        &self,
        id: Uuid,
        response: String,
        status: InquiryStatus,
        responded_at: OffsetDateTime,
    ) -> Result<InquiryRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct UpsertCustomerParams {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateRepairRequestParams {
    pub customer_id: Uuid,
    pub device_type: String,
    pub issue_description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairRequestWithCustomer {
    #[serde(flatten)]
    pub request: RepairRequestRecord,
    pub customer_name: String,
    pub customer_email: String,
}

#[async_trait]
pub trait RepairsRepo: Send + Sync {
    async fn upsert_customer(&self, params: UpsertCustomerParams)
    -> Result<CustomerRecord, RepoError>;

    async fn create_repair_request(
        &self,
        params: CreateRepairRequestParams,
    ) -> Result<RepairRequestRecord, RepoError>;

    async fn list_repair_requests(
        &self,
        status: Option<RepairStatus>,
    ) -> Result<Vec<RepairRequestWithCustomer>, RepoError>;

    async fn find_repair_request(&self, id: Uuid) -> Result<Option<RepairRequestRecord>, RepoError>;

    async fn update_repair_status(
        &self,
        id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateAdminParams {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: AdminRole,
}

#[async_trait]
pub trait AdminsRepo: Send + Sync {
    async fn find_admin_by_username(&self, username: &str)
    -> Result<Option<AdminRecord>, RepoError>;

    async fn find_admin(&self, id: Uuid) -> Result<Option<AdminRecord>, RepoError>;

    async fn create_admin(&self, params: CreateAdminParams) -> Result<AdminRecord, RepoError>;

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError>;

    async fn upsert_site_settings(
        &self,
        settings: SiteSettingsRecord,
    ) -> Result<SiteSettingsRecord, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    /// Round-trip to the primary database.
    async fn ping(&self) -> Result<(), RepoError>;
}

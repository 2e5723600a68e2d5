//! In-memory repositories and an HTTP harness for router-level tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use shopfront::application::{
    appointments::AppointmentService,
    auth::{AdminAuthService, AuthConfig, hash_password},
    blog::BlogService,
    inquiries::InquiryService,
    invalidation::ContentInvalidator,
    products::{DeletePolicy, ProductService},
    repairs::RepairService,
    repos::{
        AdminsRepo, AppointmentsRepo, BlogListScope, BlogQueryFilter, BlogRepo, BlogWriteRepo,
        CreateAdminParams, CreateAppointmentParams, CreateBlogPostParams, CreateInquiryParams,
        CreateProductParams, CreateRepairRequestParams, HealthRepo, InquiriesRepo,
        ProductListScope, ProductQueryFilter, ProductsRepo, ProductsWriteRepo, ReadConsistency,
        RepairRequestWithCustomer, RepairsRepo, RepoError, SettingsRepo, UpdateBlogPostParams,
        UpdateProductParams, UpdateStockParams, UpsertCustomerParams,
    },
    settings::SettingsService,
};
use shopfront::cache::{Cache, MemoryStore, NoopRevalidator, ResponseCache, Revalidator};
use shopfront::domain::{
    entities::{
        AdminRecord, AppointmentRecord, BlogPostRecord, CustomerRecord, InquiryRecord,
        ProductRecord, RepairRequestRecord, SiteSettingsRecord,
    },
    types::{
        AdminRole, AppointmentStatus, BlogPostStatus, InquiryStatus, ProductStatus, RepairStatus,
    },
};
use shopfront::infra::http::{self, HttpState, SessionConfig};

pub const JWT_SECRET: &str = "router-test-secret";
pub const ADMIN_TOKEN: &str = "legacy-admin-token";
pub const REVALIDATE_TOKEN: &str = "revalidate-secret";
pub const OWNER_PASSWORD: &str = "owner-password";
pub const EDITOR_PASSWORD: &str = "editor-password";

#[derive(Default)]
struct Tables {
    products: HashMap<Uuid, ProductRecord>,
    posts: HashMap<Uuid, BlogPostRecord>,
    appointments: HashMap<Uuid, AppointmentRecord>,
    inquiries: HashMap<Uuid, InquiryRecord>,
    customers: HashMap<Uuid, CustomerRecord>,
    repairs: HashMap<Uuid, RepairRequestRecord>,
    admins: HashMap<Uuid, AdminRecord>,
    settings: Option<SiteSettingsRecord>,
}

/// Every repository trait over one set of in-memory tables.
///
/// Pooled reads of the active product count can be made to lag behind the
/// primary for a number of calls, mimicking a replica that has not caught up.
#[derive(Default)]
pub struct MemoryRepos {
    tables: Mutex<Tables>,
    pooled_lag: AtomicU32,
    pooled_list_reads: AtomicUsize,
    unhealthy: AtomicBool,
}

impl MemoryRepos {
    /// The next `calls` pooled active counts report one product too many.
    pub fn lag_pooled_reads(&self, calls: u32) {
        self.pooled_lag.store(calls, Ordering::SeqCst);
    }

    /// How many public product listings reached the repository.
    pub fn pooled_list_reads(&self) -> usize {
        self.pooled_list_reads.load(Ordering::SeqCst)
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    pub async fn seed_admin(&self, username: &str, password: &str, role: AdminRole) -> Uuid {
        let record = AdminRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: hash_password(password).expect("hash password"),
            role,
            is_active: true,
            last_login_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        let id = record.id;
        self.tables.lock().await.admins.insert(id, record);
        id
    }

    pub async fn product(&self, id: Uuid) -> Option<ProductRecord> {
        self.tables.lock().await.products.get(&id).cloned()
    }

    pub async fn set_booking_enabled(&self, enabled: bool) {
        let mut tables = self.tables.lock().await;
        let mut settings = tables.settings.clone().unwrap_or_else(default_settings);
        settings.booking_enabled = enabled;
        tables.settings = Some(settings);
    }
}

fn default_settings() -> SiteSettingsRecord {
    SiteSettingsRecord {
        business_name: "Shopfront".to_string(),
        contact_email: "hello@example.com".to_string(),
        contact_phone: None,
        address: None,
        opening_hours: None,
        booking_enabled: true,
        updated_at: OffsetDateTime::now_utc(),
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn matches_product(product: &ProductRecord, filter: &ProductQueryFilter) -> bool {
    filter
        .category
        .as_deref()
        .is_none_or(|category| product.category.eq_ignore_ascii_case(category))
        && filter.brand.as_deref().is_none_or(|brand| {
            product
                .brand
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(brand))
        })
        && filter.search.as_deref().is_none_or(|search| {
            contains(&product.name, search) || contains(&product.description, search)
        })
        && filter.in_stock.is_none_or(|in_stock| product.in_stock == in_stock)
}

fn matches_post(post: &BlogPostRecord, filter: &BlogQueryFilter) -> bool {
    filter
        .search
        .as_deref()
        .is_none_or(|search| contains(&post.title, search) || contains(&post.content, search))
        && filter
            .author
            .as_deref()
            .is_none_or(|author| post.author.eq_ignore_ascii_case(author))
}

#[async_trait]
impl ProductsRepo for MemoryRepos {
    async fn list_products(
        &self,
        consistency: ReadConsistency,
        scope: ProductListScope,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        if consistency == ReadConsistency::Pooled {
            self.pooled_list_reads.fetch_add(1, Ordering::SeqCst);
        }
        let tables = self.tables.lock().await;
        let mut products: Vec<ProductRecord> = tables
            .products
            .values()
            .filter(|product| match scope {
                ProductListScope::Public => product.is_listed(),
                ProductListScope::Admin {
                    status,
                    include_deleted,
                } => {
                    (include_deleted || product.is_active)
                        && status.is_none_or(|status| product.status == status)
                }
            })
            .filter(|product| matches_product(product, filter))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn find_product(
        &self,
        _consistency: ReadConsistency,
        id: Uuid,
    ) -> Result<Option<ProductRecord>, RepoError> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn count_active(&self, consistency: ReadConsistency) -> Result<u64, RepoError> {
        let count = self
            .tables
            .lock()
            .await
            .products
            .values()
            .filter(|product| product.is_active)
            .count() as u64;
        if consistency == ReadConsistency::Pooled {
            let lagging = self
                .pooled_lag
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if lagging {
                return Ok(count + 1);
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl ProductsWriteRepo for MemoryRepos {
    async fn create_product(
        &self,
        params: CreateProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = ProductRecord {
            id: Uuid::new_v4(),
            name: params.name,
            description: params.description,
            price_cents: params.price_cents,
            category: params.category,
            brand: params.brand,
            sku: params.sku,
            image_url: params.image_url,
            in_stock: params.in_stock,
            stock_quantity: params.stock_quantity,
            status: params.status,
            specifications: params.specifications,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.tables.lock().await;
        let sku_taken = record.sku.as_deref().is_some_and(|sku| {
            tables
                .products
                .values()
                .any(|existing| existing.sku.as_deref() == Some(sku))
        });
        if sku_taken {
            return Err(RepoError::Duplicate {
                constraint: "products_sku_key".to_string(),
            });
        }
        tables.products.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_product(
        &self,
        params: UpdateProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let product = tables
            .products
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        product.name = params.name;
        product.description = params.description;
        product.price_cents = params.price_cents;
        product.category = params.category;
        product.brand = params.brand;
        product.sku = params.sku;
        product.image_url = params.image_url;
        product.specifications = params.specifications;
        product.updated_at = OffsetDateTime::now_utc();
        Ok(product.clone())
    }

    async fn update_product_status(
        &self,
        id: Uuid,
        status: ProductStatus,
    ) -> Result<ProductRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let product = tables.products.get_mut(&id).ok_or(RepoError::NotFound)?;
        product.status = status;
        product.updated_at = OffsetDateTime::now_utc();
        Ok(product.clone())
    }

    async fn update_product_stock(
        &self,
        params: UpdateStockParams,
    ) -> Result<ProductRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let product = tables
            .products
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        product.in_stock = params.in_stock;
        product.stock_quantity = params.stock_quantity;
        product.updated_at = OffsetDateTime::now_utc();
        Ok(product.clone())
    }

    async fn set_product_active(&self, id: Uuid, active: bool) -> Result<ProductRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let product = tables.products.get_mut(&id).ok_or(RepoError::NotFound)?;
        product.is_active = active;
        product.updated_at = OffsetDateTime::now_utc();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError> {
        self.tables
            .lock()
            .await
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl BlogRepo for MemoryRepos {
    async fn list_posts(
        &self,
        _consistency: ReadConsistency,
        scope: BlogListScope,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let mut posts: Vec<BlogPostRecord> = tables
            .posts
            .values()
            .filter(|post| match scope {
                BlogListScope::Public => post.status == BlogPostStatus::Published,
                BlogListScope::Admin { status } => {
                    status.is_none_or(|status| post.status == status)
                }
            })
            .filter(|post| matches_post(post, filter))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn find_post_by_slug(
        &self,
        _consistency: ReadConsistency,
        slug: &str,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        Ok(self
            .tables
            .lock()
            .await
            .posts
            .values()
            .find(|post| post.slug == slug)
            .cloned())
    }

    async fn find_post(
        &self,
        _consistency: ReadConsistency,
        id: Uuid,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        Ok(self.tables.lock().await.posts.get(&id).cloned())
    }
}

#[async_trait]
impl BlogWriteRepo for MemoryRepos {
    async fn create_post(&self, params: CreateBlogPostParams) -> Result<BlogPostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.posts.values().any(|post| post.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "blog_posts_slug_key".to_string(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let record = BlogPostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            content: params.content,
            excerpt: params.excerpt,
            featured_image: params.featured_image,
            author: params.author,
            status: params.status,
            published_at: params.published_at,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdateBlogPostParams) -> Result<BlogPostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables
            .posts
            .values()
            .any(|post| post.slug == params.slug && post.id != params.id)
        {
            return Err(RepoError::Duplicate {
                constraint: "blog_posts_slug_key".to_string(),
            });
        }
        let post = tables.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.slug = params.slug;
        post.content = params.content;
        post.excerpt = params.excerpt;
        post.featured_image = params.featured_image;
        post.author = params.author;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn update_post_status(
        &self,
        id: Uuid,
        status: BlogPostStatus,
        published_at: Option<OffsetDateTime>,
    ) -> Result<BlogPostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.status = status;
        post.published_at = published_at;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        self.tables
            .lock()
            .await
            .posts
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl AppointmentsRepo for MemoryRepos {
    async fn create_appointment(
        &self,
        params: CreateAppointmentParams,
    ) -> Result<AppointmentRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = AppointmentRecord {
            id: Uuid::new_v4(),
            customer_name: params.customer_name,
            customer_email: params.customer_email,
            customer_phone: params.customer_phone,
            service: params.service,
            device_type: params.device_type,
            device_model: params.device_model,
            issue_description: params.issue_description,
            preferred_date: params.preferred_date,
            preferred_time: params.preferred_time,
            appointment_type: params.appointment_type,
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .await
            .appointments
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_appointments(
        &self,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, RepoError> {
        Ok(self
            .tables
            .lock()
            .await
            .appointments
            .values()
            .filter(|appointment| status.is_none_or(|status| appointment.status == status))
            .cloned()
            .collect())
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<AppointmentRecord>, RepoError> {
        Ok(self.tables.lock().await.appointments.get(&id).cloned())
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let appointment = tables
            .appointments
            .get_mut(&id)
            .ok_or(RepoError::NotFound)?;
        appointment.status = status;
        appointment.updated_at = OffsetDateTime::now_utc();
        Ok(appointment.clone())
    }

    async fn update_appointment_notes(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<AppointmentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let appointment = tables
            .appointments
            .get_mut(&id)
            .ok_or(RepoError::NotFound)?;
        appointment.notes = notes;
        appointment.updated_at = OffsetDateTime::now_utc();
        Ok(appointment.clone())
    }
}

#[async_trait]
impl InquiriesRepo for MemoryRepos {
    async fn create_inquiry(
        &self,
        params: CreateInquiryParams,
    ) -> Result<InquiryRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = InquiryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            email: params.email,
            phone: params.phone,
            service: params.service,
            urgency: params.urgency,
            message: params.message,
            status: InquiryStatus::New,
            response: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .await
            .inquiries
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_inquiries(
        &self,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<InquiryRecord>, RepoError> {
        Ok(self
            .tables
            .lock()
            .await
            .inquiries
            .values()
            .filter(|inquiry| status.is_none_or(|status| inquiry.status == status))
            .cloned()
            .collect())
    }

    async fn find_inquiry(&self, id: Uuid) -> Result<Option<InquiryRecord>, RepoError> {
        Ok(self.tables.lock().await.inquiries.get(&id).cloned())
    }

    async fn update_inquiry_status(
        &self,
        id: Uuid,
        status: InquiryStatus,
    ) -> Result<InquiryRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let inquiry = tables.inquiries.get_mut(&id).ok_or(RepoError::NotFound)?;
        inquiry.status = status;
        inquiry.updated_at = OffsetDateTime::now_utc();
        Ok(inquiry.clone())
    }

    async fn record_inquiry_response(
        &self,
        id: Uuid,
        response: String,
        status: InquiryStatus,
        responded_at: OffsetDateTime,
    ) -> Result<InquiryRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let inquiry = tables.inquiries.get_mut(&id).ok_or(RepoError::NotFound)?;
        inquiry.response = Some(response);
        inquiry.status = status;
        inquiry.responded_at = Some(responded_at);
        inquiry.updated_at = responded_at;
        Ok(inquiry.clone())
    }
}

#[async_trait]
impl RepairsRepo for MemoryRepos {
    async fn upsert_customer(
        &self,
        params: UpsertCustomerParams,
    ) -> Result<CustomerRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .customers
            .values_mut()
            .find(|customer| customer.email == params.email)
        {
            existing.name = params.name;
            if params.phone.is_some() {
                existing.phone = params.phone;
            }
            return Ok(existing.clone());
        }
        let record = CustomerRecord {
            id: Uuid::new_v4(),
            name: params.name,
            email: params.email,
            phone: params.phone,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.customers.insert(record.id, record.clone());
        Ok(record)
    }

    async fn create_repair_request(
        &self,
        params: CreateRepairRequestParams,
    ) -> Result<RepairRequestRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if !tables.customers.contains_key(&params.customer_id) {
            return Err(RepoError::Integrity {
                message: "unknown customer".to_string(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let record = RepairRequestRecord {
            id: Uuid::new_v4(),
            customer_id: params.customer_id,
            device_type: params.device_type,
            issue_description: params.issue_description,
            status: RepairStatus::Received,
            created_at: now,
            updated_at: now,
        };
        tables.repairs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_repair_requests(
        &self,
        status: Option<RepairStatus>,
    ) -> Result<Vec<RepairRequestWithCustomer>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .repairs
            .values()
            .filter(|request| status.is_none_or(|status| request.status == status))
            .filter_map(|request| {
                let customer = tables.customers.get(&request.customer_id)?;
                Some(RepairRequestWithCustomer {
                    request: request.clone(),
                    customer_name: customer.name.clone(),
                    customer_email: customer.email.clone(),
                })
            })
            .collect())
    }

    async fn find_repair_request(
        &self,
        id: Uuid,
    ) -> Result<Option<RepairRequestRecord>, RepoError> {
        Ok(self.tables.lock().await.repairs.get(&id).cloned())
    }

    async fn update_repair_status(
        &self,
        id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let request = tables.repairs.get_mut(&id).ok_or(RepoError::NotFound)?;
        request.status = status;
        request.updated_at = OffsetDateTime::now_utc();
        Ok(request.clone())
    }
}

#[async_trait]
impl AdminsRepo for MemoryRepos {
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminRecord>, RepoError> {
        Ok(self
            .tables
            .lock()
            .await
            .admins
            .values()
            .find(|admin| admin.username == username)
            .cloned())
    }

    async fn find_admin(&self, id: Uuid) -> Result<Option<AdminRecord>, RepoError> {
        Ok(self.tables.lock().await.admins.get(&id).cloned())
    }

    async fn create_admin(&self, params: CreateAdminParams) -> Result<AdminRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables
            .admins
            .values()
            .any(|admin| admin.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "admin_users_username_key".to_string(),
            });
        }
        let record = AdminRecord {
            id: Uuid::new_v4(),
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            role: params.role,
            is_active: true,
            last_login_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.admins.insert(record.id, record.clone());
        Ok(record)
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let admin = tables.admins.get_mut(&id).ok_or(RepoError::NotFound)?;
        admin.last_login_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl SettingsRepo for MemoryRepos {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        Ok(self
            .tables
            .lock()
            .await
            .settings
            .clone()
            .unwrap_or_else(default_settings))
    }

    async fn upsert_site_settings(
        &self,
        mut settings: SiteSettingsRecord,
    ) -> Result<SiteSettingsRecord, RepoError> {
        settings.updated_at = OffsetDateTime::now_utc();
        self.tables.lock().await.settings = Some(settings.clone());
        Ok(settings)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepos {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<MemoryRepos>,
    pub cache: Cache,
    pub response_cache: Option<ResponseCache>,
}

pub struct TestAppBuilder {
    shared: Option<(Arc<MemoryRepos>, Cache)>,
    cache_ttl: Duration,
    response_cache: bool,
    jwt_secret: Option<String>,
    admin_token: Option<String>,
    revalidate_token: Option<String>,
    delete_attempts: u32,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            shared: None,
            cache_ttl: Duration::from_secs(60),
            response_cache: false,
            jwt_secret: Some(JWT_SECRET.to_string()),
            admin_token: Some(ADMIN_TOKEN.to_string()),
            revalidate_token: Some(REVALIDATE_TOKEN.to_string()),
            delete_attempts: 3,
        }
    }
}

impl TestAppBuilder {
    /// Another instance of the same deployment: same database and object
    /// cache, its own response cache.
    pub fn sharing_backends_with(mut self, other: &TestApp) -> Self {
        self.shared = Some((other.repos.clone(), other.cache.clone()));
        self
    }

    /// TTL for both the object cache and the response cache.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_response_cache(mut self) -> Self {
        self.response_cache = true;
        self
    }

    pub fn without_revalidate_token(mut self) -> Self {
        self.revalidate_token = None;
        self
    }

    pub fn without_jwt_secret(mut self) -> Self {
        self.jwt_secret = None;
        self
    }

    pub fn delete_attempts(mut self, attempts: u32) -> Self {
        self.delete_attempts = attempts;
        self
    }

    pub fn build(self) -> TestApp {
        let (repos, cache) = self.shared.unwrap_or_else(|| {
            (
                Arc::new(MemoryRepos::default()),
                Cache::new(Arc::new(MemoryStore::new()), "shopfront", self.cache_ttl),
            )
        });
        let response_cache = self
            .response_cache
            .then(|| ResponseCache::new(64, self.cache_ttl));
        let revalidator: Arc<dyn Revalidator> = match response_cache.clone() {
            Some(cache) => Arc::new(cache),
            None => Arc::new(NoopRevalidator),
        };
        let invalidator = ContentInvalidator::new(cache.clone(), revalidator);
        let policy = DeletePolicy {
            attempts: NonZeroU32::new(self.delete_attempts).expect("attempts must be positive"),
            delay: Duration::from_millis(1),
        };

        let state = HttpState {
            products: Arc::new(ProductService::new(
                repos.clone(),
                repos.clone(),
                cache.clone(),
                invalidator.clone(),
                policy,
            )),
            blog: Arc::new(BlogService::new(
                repos.clone(),
                repos.clone(),
                cache.clone(),
                invalidator.clone(),
            )),
            appointments: Arc::new(AppointmentService::new(repos.clone(), repos.clone())),
            inquiries: Arc::new(InquiryService::new(repos.clone())),
            repairs: Arc::new(RepairService::new(repos.clone())),
            settings: Arc::new(SettingsService::new(repos.clone(), invalidator.clone())),
            auth: Arc::new(AdminAuthService::new(
                repos.clone(),
                AuthConfig {
                    jwt_secret: self.jwt_secret,
                    admin_token: self.admin_token,
                    session_ttl: Duration::from_secs(3600),
                },
            )),
            invalidator,
            health: repos.clone(),
            response_cache: response_cache.clone(),
            session: SessionConfig {
                secure: false,
                ttl: Duration::from_secs(3600),
            },
            revalidate_token: self.revalidate_token,
        };

        TestApp {
            router: http::build_router(state),
            repos,
            cache,
            response_cache,
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        TestAppBuilder::default().build()
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::default()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Sends the request and decodes the body as JSON (`Null` when empty).
    pub async fn call(&self, request: Request<Body>) -> (u16, Value) {
        let response = self.send(request).await;
        let status = response.status().as_u16();
        (status, body_json(response).await)
    }

    /// Logs in through the API and returns the session token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(json_request(
                "POST",
                "/api/admin/login",
                None,
                serde_json::json!({ "username": username, "password": password }),
            ))
            .await;
        assert_eq!(status, 200, "login failed: {body}");
        body["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

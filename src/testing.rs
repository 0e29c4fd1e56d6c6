// In-memory collaborators so handler and service tests run without Postgres

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::auth::{
    error::AuthError,
    mailer::{MailError, RecoveryEmail, RecoveryMailer},
    models::{NewUser, User, UserChanges},
    password::fast_password_service,
    repository::UserStore,
    service::{AuthService, AuthSettings},
    token::TokenService,
};
use crate::db::{create_pool, run_migrations};
use crate::error::ApiError;
use crate::products::{models::money, NewProduct, Product, ProductChanges, ProductStore};
use crate::query::{SortField, SortOrder, ValidatedQuery};
use crate::{create_router, AppState};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<User>>,
    next_id: Mutex<i32>,
}

impl InMemoryUserStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let email = email.to_lowercase();
        Ok(self.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let mut users = self.lock().clone();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<User, AuthError> {
        let mut users = self.lock();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::EmailAlreadyExists);
        }
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;

        let now = Utc::now();
        let user = User {
            id: *next_id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            recovery_token_hash: None,
            recovery_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<User>, AuthError> {
        let mut users = self.lock();
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AuthError::EmailAlreadyExists);
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(phone) = changes.phone {
            user.phone = phone;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
            user.recovery_token_hash = None;
            user.recovery_expires_at = None;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i32) -> Result<bool, AuthError> {
        let mut users = self.lock();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn set_recovery_token(
        &self,
        id: i32,
        token: Option<(String, DateTime<Utc>)>,
    ) -> Result<(), AuthError> {
        if let Some(user) = self.lock().iter_mut().find(|u| u.id == id) {
            let (hash, expires_at) = token.unzip();
            user.recovery_token_hash = hash;
            user.recovery_expires_at = expires_at;
        }
        Ok(())
    }

    async fn consume_recovery_token(
        &self,
        id: i32,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AuthError> {
        let mut users = self.lock();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        let live = user.recovery_token_hash.as_deref() == Some(token_hash)
            && user.recovery_expires_at.is_some_and(|at| at > Utc::now());
        if !live {
            return Ok(None);
        }

        user.password_hash = password_hash.to_string();
        user.recovery_token_hash = None;
        user.recovery_expires_at = None;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryProductStore {
    products: Mutex<Vec<Product>>,
    next_id: Mutex<i32>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn product_matches(product: &Product, query: &ValidatedQuery) -> bool {
    query
        .search
        .as_deref()
        .map_or(true, |s| contains_ci(&product.name, s) || contains_ci(&product.brand, s))
        && query.name.as_deref().map_or(true, |n| contains_ci(&product.name, n))
        && query.brand.as_deref().map_or(true, |b| contains_ci(&product.brand, b))
        && query.min_price.map_or(true, |min| product.price >= min)
        && query.max_price.map_or(true, |max| product.price <= max)
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn list(&self, query: &ValidatedQuery) -> Result<Vec<Product>, ApiError> {
        let mut products: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| product_matches(p, query))
            .cloned()
            .collect();

        products.sort_by(|a, b| {
            let ordering = match query.sort_field {
                SortField::Name => a.name.cmp(&b.name),
                SortField::Price => a.price.cmp(&b.price),
            };
            let ordering = match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then(a.id.cmp(&b.id))
        });

        if let Some((page, limit)) = query.pagination {
            let offset = ((page - 1) * limit) as usize;
            products = products.into_iter().skip(offset).take(limit as usize).collect();
        }
        Ok(products)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, ApiError> {
        Ok(self.products.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, product: NewProduct) -> Result<Product, ApiError> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;

        let now = Utc::now();
        let product = Product {
            id: *next_id,
            name: product.name,
            description: product.description,
            brand: product.brand,
            price: money(product.price),
            created_at: now,
            updated_at: now,
        };
        self.products.lock().unwrap().push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Option<Product>, ApiError> {
        let mut products = self.products.lock().unwrap();
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        if let Some(brand) = changes.brand {
            product.brand = brand;
        }
        if let Some(price) = changes.price {
            product.price = money(price);
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: i32) -> Result<Option<Product>, ApiError> {
        let mut products = self.products.lock().unwrap();
        let position = products.iter().position(|p| p.id == id);
        Ok(position.map(|i| products.remove(i)))
    }
}

/// Records every delivery; `failing()` rejects them all
#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<RecoveryEmail>>,
    fail: bool,
}

impl CapturingMailer {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<RecoveryEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Deliveries run on a spawned task; poll until `count` have landed
    pub async fn wait_for(&self, count: usize) -> Vec<RecoveryEmail> {
        for _ in 0..100 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

impl RecoveryMailer for CapturingMailer {
    fn send(&self, message: &RecoveryEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Delivery("smtp unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn test_token_service() -> TokenService {
    TokenService::new("test-secret", 900, 604_800)
}

pub fn test_auth_service_with_mailer(
    settings: AuthSettings,
    mailer: CapturingMailer,
) -> (Arc<AuthService>, Arc<CapturingMailer>) {
    let mailer = Arc::new(mailer);
    let service = AuthService::new(
        Arc::new(InMemoryUserStore::default()),
        fast_password_service(),
        test_token_service(),
        mailer.clone(),
        settings,
    )
    .unwrap();
    (Arc::new(service), mailer)
}

pub fn test_auth_service_with(settings: AuthSettings) -> (Arc<AuthService>, Arc<CapturingMailer>) {
    test_auth_service_with_mailer(settings, CapturingMailer::default())
}

pub fn test_auth_service() -> (Arc<AuthService>, Arc<CapturingMailer>) {
    test_auth_service_with(AuthSettings::default())
}

/// Full router over in-memory stores
pub fn test_server_with(settings: AuthSettings) -> (TestServer, Arc<CapturingMailer>) {
    let (auth, mailer) = test_auth_service_with(settings);
    let state = AppState {
        auth,
        products: Arc::new(InMemoryProductStore::default()),
    };
    (TestServer::new(create_router(state)).unwrap(), mailer)
}

pub fn test_server() -> TestServer {
    test_server_with(AuthSettings::default()).0
}

/// Pool on `TEST_DATABASE_URL` with migrations applied. `None` when the
/// variable is unset, and the Postgres tests return early.
pub async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping Postgres test");
        return None;
    };
    let pool = create_pool(&database_url)
        .await
        .expect("Failed to connect to test database");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Some(pool)
}

/// Suffix that keeps rows written by concurrent tests apart
pub fn unique_suffix() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}{}", timestamp, COUNTER.fetch_add(1, Ordering::SeqCst))
}

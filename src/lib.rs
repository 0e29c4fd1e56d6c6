pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod products;
pub mod query;
pub mod validation;

use std::sync::Arc;

use axum::{extract::FromRef, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{handlers as user_handlers, models as user_models, AuthService};
use crate::products::{handlers as product_handlers, models as product_models, ProductStore};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        user_handlers::list_users_handler,
        user_handlers::get_user_handler,
        user_handlers::register_handler,
        user_handlers::login_handler,
        user_handlers::refresh_handler,
        user_handlers::profile_handler,
        user_handlers::forgot_password_handler,
        user_handlers::validate_token_handler,
        user_handlers::reset_password_handler,
        user_handlers::change_password_handler,
        user_handlers::update_user_handler,
        user_handlers::delete_user_handler,
        product_handlers::list_products_handler,
        product_handlers::search_products_handler,
        product_handlers::get_product_handler,
        product_handlers::create_product_handler,
        product_handlers::replace_product_handler,
        product_handlers::patch_product_handler,
        product_handlers::delete_product_handler,
    ),
    components(
        schemas(
            user_models::UserResponse,
            user_models::RegisterRequest,
            user_models::LoginRequest,
            user_models::RefreshRequest,
            user_models::UpdateUserRequest,
            user_models::ChangePasswordRequest,
            user_models::ForgotPasswordRequest,
            user_models::ValidateTokenRequest,
            user_models::ResetPasswordRequest,
            user_models::AuthResponse,
            user_models::AccessTokenResponse,
            user_models::MessageResponse,
            user_models::UserMessageResponse,
            user_models::ForgotPasswordResponse,
            user_models::TokenValidResponse,
            product_models::Product,
            product_models::ProductRequest,
            product_models::PatchProductRequest,
            product_models::ProductMessageResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "usuarios", description = "Registration, sessions and password recovery"),
        (name = "produtos", description = "Product catalogue")
    ),
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = "Users, JWT sessions and a product catalogue"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub products: Arc<dyn ProductStore>,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ProductStore> {
    fn from_ref(state: &AppState) -> Self {
        state.products.clone()
    }
}

/// Creates and configures the application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/usuarios", user_handlers::routes())
        .nest("/produtos", product_handlers::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod testing;

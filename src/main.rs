use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use storefront_api::{
    auth::{AuthService, AuthSettings, LogMailer, PasswordService, PgUserRepository, TokenService},
    config::AppConfig,
    create_router, db,
    products::PgProductRepository,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront_api=info,tower_http=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Storefront API - Starting...");

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    let auth = AuthService::new(
        Arc::new(PgUserRepository::new(db_pool.clone())),
        PasswordService::new(),
        TokenService::from_config(&config.jwt),
        Arc::new(LogMailer),
        AuthSettings::from_config(&config),
    )?;
    if config.recovery.expose_token {
        tracing::warn!("EXPOSE_RECOVERY_TOKEN is enabled; recovery tokens are echoed in responses");
    }

    let state = AppState {
        auth: Arc::new(auth),
        products: Arc::new(PgProductRepository::new(db_pool)),
    };
    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Storefront API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

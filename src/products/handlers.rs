// HTTP handlers for the /produtos endpoints

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, info};
use validator::Validate;

use crate::auth::{authorize, models::MessageResponse, AuthService, AuthenticatedUser, Operation};
use crate::error::{ApiError, ErrorResponse};
use crate::products::{
    models::{PatchProductRequest, Product, ProductChanges, ProductMessageResponse, ProductRequest},
    repository::ProductStore,
};
use crate::query::{QueryParams, QueryValidator, SearchParams};

const PRODUCT: &str = "Produto";

/// Routes mounted under `/produtos`
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<dyn ProductStore>: FromRef<S>,
    Arc<AuthService>: FromRef<S>,
{
    Router::new()
        .route("/", get(list_products_handler).post(create_product_handler))
        .route("/buscar", get(search_products_handler))
        .route(
            "/:id",
            get(get_product_handler)
                .put(replace_product_handler)
                .patch(patch_product_handler)
                .delete(delete_product_handler),
        )
}

async fn find_product(store: &dyn ProductStore, id: i32) -> Result<Product, ApiError> {
    store.find_by_id(id).await?.ok_or_else(|| {
        debug!(product_id = id, "product not found");
        ApiError::NotFound { resource: PRODUCT, id }
    })
}

/// List products with optional search, price range, sorting and pagination
#[utoipa::path(
    get,
    path = "/produtos",
    params(QueryParams),
    responses(
        (status = 200, description = "Matching products", body = Vec<Product>),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    ),
    tag = "produtos"
)]
pub async fn list_products_handler(
    State(store): State<Arc<dyn ProductStore>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let query = QueryValidator::validate(params).map_err(|e| ApiError::InvalidQuery(e.message))?;
    let products = store.list(&query).await?;
    debug!(count = products.len(), "products listed");
    Ok(Json(products.into_iter().map(Product::with_money_scale).collect()))
}

/// Filter by name and brand substrings, both applied together
#[utoipa::path(
    get,
    path = "/produtos/buscar",
    params(SearchParams),
    responses((status = 200, description = "Matching products", body = Vec<Product>)),
    tag = "produtos"
)]
pub async fn search_products_handler(
    State(store): State<Arc<dyn ProductStore>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let query = QueryValidator::validate_search(params);
    let products = store.list(&query).await?;
    Ok(Json(products.into_iter().map(Product::with_money_scale).collect()))
}

#[utoipa::path(
    get,
    path = "/produtos/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "produtos"
)]
pub async fn get_product_handler(
    State(store): State<Arc<dyn ProductStore>>,
    Path(id): Path<i32>,
) -> Result<Json<Product>, ApiError> {
    let product = find_product(store.as_ref(), id).await?;
    Ok(Json(product.with_money_scale()))
}

#[utoipa::path(
    post,
    path = "/produtos",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductMessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "produtos"
)]
pub async fn create_product_handler(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(store): State<Arc<dyn ProductStore>>,
    Json(payload): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductMessageResponse>), ApiError> {
    authorize(Operation::CreateProduct, Some(&caller), None)?;
    let new_product = payload.into_new_product()?;

    let product = store.create(new_product).await?;
    info!(product_id = product.id, user_id = caller.id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(ProductMessageResponse {
            message: "Produto criado com sucesso".to_string(),
            product: product.with_money_scale(),
        }),
    ))
}

/// Replace every field of a product
#[utoipa::path(
    put,
    path = "/produtos/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product replaced", body = ProductMessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "produtos"
)]
pub async fn replace_product_handler(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(store): State<Arc<dyn ProductStore>>,
    Path(id): Path<i32>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ProductMessageResponse>, ApiError> {
    authorize(Operation::UpdateProduct, Some(&caller), None)?;
    find_product(store.as_ref(), id).await?;
    let new_product = payload.into_new_product()?;

    let product = store
        .update(id, ProductChanges::from(new_product))
        .await?
        .ok_or(ApiError::NotFound { resource: PRODUCT, id })?;

    info!(product_id = id, user_id = caller.id, "product replaced");
    Ok(Json(ProductMessageResponse {
        message: "Produto atualizado com sucesso".to_string(),
        product: product.with_money_scale(),
    }))
}

/// Update only the supplied fields of a product
#[utoipa::path(
    patch,
    path = "/produtos/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    request_body = PatchProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductMessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "produtos"
)]
pub async fn patch_product_handler(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(store): State<Arc<dyn ProductStore>>,
    Path(id): Path<i32>,
    Json(payload): Json<PatchProductRequest>,
) -> Result<Json<ProductMessageResponse>, ApiError> {
    authorize(Operation::UpdateProduct, Some(&caller), None)?;
    let existing = find_product(store.as_ref(), id).await?;
    payload.validate()?;

    let changes = ProductChanges::from(payload);
    let product = if changes.is_empty() {
        existing
    } else {
        store
            .update(id, changes)
            .await?
            .ok_or(ApiError::NotFound { resource: PRODUCT, id })?
    };

    info!(product_id = id, user_id = caller.id, "product patched");
    Ok(Json(ProductMessageResponse {
        message: "Produto atualizado parcialmente com sucesso".to_string(),
        product: product.with_money_scale(),
    }))
}

#[utoipa::path(
    delete,
    path = "/produtos/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product removed", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "produtos"
)]
pub async fn delete_product_handler(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(store): State<Arc<dyn ProductStore>>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize(Operation::DeleteProduct, Some(&caller), None)?;
    let product = store
        .delete(id)
        .await?
        .ok_or(ApiError::NotFound { resource: PRODUCT, id })?;

    info!(product_id = id, user_id = caller.id, "product removed");
    Ok(Json(MessageResponse::new(format!(
        "Produto \"{}\" removido com sucesso",
        product.name
    ))))
}

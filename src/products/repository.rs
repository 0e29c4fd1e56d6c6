// Product persistence: the catalogue storage seam and its Postgres implementation

use axum::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::error::ApiError;
use crate::products::models::{NewProduct, Product, ProductChanges};
use crate::query::{SQLQueryBuilder, ValidatedQuery, PRODUCT_COLUMNS};

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Products matching every filter of `query`, in its sort order
    async fn list(&self, query: &ValidatedQuery) -> Result<Vec<Product>, ApiError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, ApiError>;

    async fn create(&self, product: NewProduct) -> Result<Product, ApiError>;

    /// Apply `changes` and bump `updated_at`; `None` when the row is gone
    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Option<Product>, ApiError>;

    /// The deleted row, if there was one
    async fn delete(&self, id: i32) -> Result<Option<Product>, ApiError>;
}

/// Repository for database operations on products
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductRepository {
    async fn list(&self, query: &ValidatedQuery) -> Result<Vec<Product>, ApiError> {
        let (sql, params) = SQLQueryBuilder::from_query(query).build();
        debug!(sql = %sql, "listing products");

        let mut statement = sqlx::query_as::<_, Product>(&sql);
        for param in params {
            statement = statement.bind(param);
        }
        let products = statement.fetch_all(&self.pool).await?;
        Ok(products)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, ApiError> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn create(&self, product: NewProduct) -> Result<Product, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO products (name, description, brand, price)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.brand)
            .bind(product.price)
            .fetch_one(&self.pool)
            .await?;

        debug!(product_id = product.id, "product row inserted");
        Ok(product)
    }

    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Option<Product>, ApiError> {
        let sql = format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                brand = COALESCE($4, brand),
                price = COALESCE($5, price),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.description)
            .bind(changes.brand)
            .bind(changes.price)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn delete(&self, id: i32) -> Result<Option<Product>, ApiError> {
        let sql = format!("DELETE FROM products WHERE id = $1 RETURNING {}", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::query::{SortField, SortOrder};
    use crate::testing::{test_pool, unique_suffix};

    fn new_product(name: &str, brand: &str, price: rust_decimal::Decimal) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: "Produto de teste com descrição longa".to_string(),
            brand: brand.to_string(),
            price,
        }
    }

    #[tokio::test]
    async fn test_pg_price_range_listing() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgProductRepository::new(pool);
        let brand = format!("Marca{}", unique_suffix());

        let mut ids = Vec::new();
        for (name, price) in [("Caneca", dec!(10.00)), ("Garrafa", dec!(25.50)), ("Chaleira", dec!(99.90))] {
            ids.push(repo.create(new_product(name, &brand, price)).await.unwrap().id);
        }

        let query = ValidatedQuery {
            search: Some(brand.to_lowercase()),
            min_price: Some(dec!(20)),
            max_price: Some(dec!(99.90)),
            sort_field: SortField::Price,
            sort_order: SortOrder::Desc,
            ..ValidatedQuery::default()
        };
        let products = repo.list(&query).await.unwrap();
        let prices: Vec<_> = products.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![dec!(99.90), dec!(25.50)]);

        let page = ValidatedQuery {
            search: Some(brand.clone()),
            pagination: Some((2, 2)),
            ..ValidatedQuery::default()
        };
        let names: Vec<_> = repo.list(&page).await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Garrafa".to_string()]);

        for id in ids {
            assert!(repo.delete(id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_pg_update_and_delete_return_the_row() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgProductRepository::new(pool);
        let brand = format!("Marca{}", unique_suffix());
        let created = repo.create(new_product("Caneca", &brand, dec!(18.90))).await.unwrap();

        let changes = ProductChanges {
            price: Some(dec!(21.5)),
            ..ProductChanges::default()
        };
        let updated = repo.update(created.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.price, dec!(21.50));
        assert_eq!(updated.name, "Caneca");
        assert!(updated.updated_at >= created.updated_at);

        let deleted = repo.delete(created.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
        assert!(repo.update(created.id, ProductChanges::default()).await.unwrap().is_none());
        assert!(repo.delete(created.id).await.unwrap().is_none());
    }
}

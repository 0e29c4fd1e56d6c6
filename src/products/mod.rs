// Product catalogue: model, storage and /produtos handlers

pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{NewProduct, Product, ProductChanges};
pub use repository::{PgProductRepository, ProductStore};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::validation::{
    field_error, validate_brand, validate_description, validate_positive_price, validate_product_name,
};

/// A catalogue product as stored and as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Product {
    #[schema(example = 1)]
    pub id: i32,
    #[serde(rename = "nome")]
    #[schema(example = "Café Torrado")]
    pub name: String,
    #[serde(rename = "descricao")]
    #[schema(example = "Café torrado e moído, pacote de 500g")]
    pub description: String,
    #[serde(rename = "marca")]
    #[schema(example = "Pilão")]
    pub brand: String,
    /// Serialised as a decimal string with two places
    #[serde(rename = "preco")]
    #[schema(value_type = String, example = "18.90")]
    pub price: Decimal,
    #[serde(rename = "criado")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizado")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Pin the price to two decimal places for output
    pub fn with_money_scale(mut self) -> Self {
        self.price = money(self.price);
        self
    }
}

pub fn money(price: Decimal) -> Decimal {
    let mut price = price;
    price.rescale(2);
    price
}

/// Fully validated values ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: Decimal,
}

/// Partial change set; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.brand.is_none()
            && self.price.is_none()
    }
}

/// Body of `POST /produtos` and `PUT /produtos/{id}`
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ProductRequest {
    #[serde(rename = "nome")]
    #[validate(
        required(message = "Este campo é obrigatório."),
        custom = "validate_product_name"
    )]
    #[schema(example = "Café Torrado")]
    pub name: Option<String>,

    #[serde(rename = "descricao")]
    #[validate(
        required(message = "Este campo é obrigatório."),
        custom = "validate_description"
    )]
    #[schema(example = "Café torrado e moído, pacote de 500g")]
    pub description: Option<String>,

    #[serde(rename = "marca")]
    #[validate(required(message = "Este campo é obrigatório."), custom = "validate_brand")]
    #[schema(example = "Pilão")]
    pub brand: Option<String>,

    #[serde(rename = "preco")]
    #[validate(
        required(message = "Este campo é obrigatório."),
        custom = "validate_positive_price"
    )]
    #[schema(value_type = Option<String>, example = "18.90")]
    pub price: Option<Decimal>,
}

impl ProductRequest {
    /// Validate and produce trimmed values
    pub fn into_new_product(self) -> Result<NewProduct, ValidationErrors> {
        self.validate()?;
        let required = |field| field_error(field, "required", "Este campo é obrigatório.");
        Ok(NewProduct {
            name: self.name.ok_or_else(|| required("nome"))?.trim().to_string(),
            description: self
                .description
                .ok_or_else(|| required("descricao"))?
                .trim()
                .to_string(),
            brand: self.brand.ok_or_else(|| required("marca"))?.trim().to_string(),
            price: money(self.price.ok_or_else(|| required("preco"))?),
        })
    }
}

/// Body of `PATCH /produtos/{id}`; only the supplied fields are checked
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct PatchProductRequest {
    #[serde(rename = "nome")]
    #[validate(custom = "validate_product_name")]
    pub name: Option<String>,

    #[serde(rename = "descricao")]
    #[validate(custom = "validate_description")]
    pub description: Option<String>,

    #[serde(rename = "marca")]
    #[validate(custom = "validate_brand")]
    pub brand: Option<String>,

    #[serde(rename = "preco")]
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
}

impl From<PatchProductRequest> for ProductChanges {
    fn from(req: PatchProductRequest) -> Self {
        Self {
            name: req.name.map(|s| s.trim().to_string()),
            description: req.description.map(|s| s.trim().to_string()),
            brand: req.brand.map(|s| s.trim().to_string()),
            price: req.price.map(money),
        }
    }
}

impl From<NewProduct> for ProductChanges {
    fn from(product: NewProduct) -> Self {
        Self {
            name: Some(product.name),
            description: Some(product.description),
            brand: Some(product.brand),
            price: Some(product.price),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductMessageResponse {
    #[serde(rename = "mensagem")]
    pub message: String,
    #[serde(rename = "produto")]
    pub product: Product,
}

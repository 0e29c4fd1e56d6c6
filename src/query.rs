// Product listing: query parameter validation and SQL construction

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use utoipa::IntoParams;

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, description, brand, price, created_at, updated_at";

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// SQL query builder for constructing parameterized product queries
pub struct SQLQueryBuilder {
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: String,
    pagination: Option<(u32, u32)>,
}

impl Default for SQLQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SQLQueryBuilder {
    pub fn new() -> Self {
        Self {
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_clause: "name ASC, id ASC".to_string(),
            pagination: None,
        }
    }

    fn next_param(&mut self, value: String) -> usize {
        self.params.push(value);
        self.params.len()
    }

    /// Case-insensitive substring match on name OR brand, one bound parameter
    pub fn add_search_filter(&mut self, search: &str) {
        let index = self.next_param(like_pattern(search));
        self.where_clauses
            .push(format!("(name ILIKE ${0} OR brand ILIKE ${0})", index));
    }

    pub fn add_name_filter(&mut self, name: &str) {
        let index = self.next_param(like_pattern(name));
        self.where_clauses.push(format!("name ILIKE ${}", index));
    }

    pub fn add_brand_filter(&mut self, brand: &str) {
        let index = self.next_param(like_pattern(brand));
        self.where_clauses.push(format!("brand ILIKE ${}", index));
    }

    /// Inclusive price bounds. Parameters are bound as text, hence the cast.
    pub fn add_price_range(&mut self, min: Option<Decimal>, max: Option<Decimal>) {
        if let Some(min_price) = min {
            let index = self.next_param(min_price.to_string());
            self.where_clauses.push(format!("price >= ${}::numeric", index));
        }
        if let Some(max_price) = max {
            let index = self.next_param(max_price.to_string());
            self.where_clauses.push(format!("price <= ${}::numeric", index));
        }
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        let field_name = match field {
            SortField::Name => "name",
            SortField::Price => "price",
        };
        let order_str = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        self.order_clause = format!("{} {}, id ASC", field_name, order_str);
    }

    pub fn set_pagination(&mut self, page: u32, limit: u32) {
        self.pagination = Some((page, limit));
    }

    /// Builds the final SQL string and its text parameters
    pub fn build(&self) -> (String, Vec<String>) {
        let mut query = format!("SELECT {} FROM products", PRODUCT_COLUMNS);

        if !self.where_clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.where_clauses.join(" AND "));
        }

        query.push_str(" ORDER BY ");
        query.push_str(&self.order_clause);

        // LIMIT/OFFSET are validated integers, inlined rather than bound
        if let Some((page, limit)) = self.pagination {
            let offset = (page as u64 - 1) * limit as u64;
            query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        (query, self.params.clone())
    }

    /// Builder preloaded with every filter of a validated query
    pub fn from_query(query: &ValidatedQuery) -> Self {
        let mut builder = Self::new();
        if let Some(search) = &query.search {
            builder.add_search_filter(search);
        }
        if let Some(name) = &query.name {
            builder.add_name_filter(name);
        }
        if let Some(brand) = &query.brand {
            builder.add_brand_filter(brand);
        }
        builder.add_price_range(query.min_price, query.max_price);
        builder.set_sort(query.sort_field, query.sort_order);
        if let Some((page, limit)) = query.pagination {
            builder.set_pagination(page, limit);
        }
        builder
    }
}

/// Escape LIKE metacharacters and wrap in `%..%`
fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Query parameters accepted by `GET /produtos`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueryParams {
    /// Case-insensitive substring matched against name or brand
    pub search: Option<String>,
    /// Minimum price, inclusive
    pub min_preco: Option<String>,
    /// Maximum price, inclusive
    pub max_preco: Option<String>,
    /// Sort field: "nome" (default) or "preco"
    pub ordenar: Option<String>,
    /// Sort order: "asc" (default) or "desc"
    pub ordem: Option<String>,
    /// Page number, 1-indexed; enables pagination
    pub page: Option<u32>,
    /// Page size; enables pagination
    pub limit: Option<u32>,
}

/// Query parameters accepted by `GET /produtos/buscar`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Substring of the product name
    pub nome: Option<String>,
    /// Substring of the brand
    pub marca: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Validated and normalized product query
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub search: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    /// `(page, limit)`, only when the caller asked for a page
    pub pagination: Option<(u32, u32)>,
}

impl Default for ValidatedQuery {
    fn default() -> Self {
        Self {
            search: None,
            name: None,
            brand: None,
            min_price: None,
            max_price: None,
            sort_field: SortField::Name,
            sort_order: SortOrder::Asc,
            pagination: None,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
}

impl QueryError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Query parameter validator
pub struct QueryValidator;

impl QueryValidator {
    pub fn validate(params: QueryParams) -> Result<ValidatedQuery, QueryError> {
        let min_price = Self::parse_price(params.min_preco, "min_preco")?;
        let max_price = Self::parse_price(params.max_preco, "max_preco")?;
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(QueryError::new("min_preco não pode ser maior que max_preco"));
            }
        }

        let sort_field = match Self::normalize_string(params.ordenar) {
            Some(field) => Self::parse_sort_field(&field)?,
            None => SortField::Name,
        };
        let sort_order = match Self::normalize_string(params.ordem) {
            Some(order) => Self::parse_sort_order(&order)?,
            None => SortOrder::Asc,
        };

        let pagination = match (params.page, params.limit) {
            (None, None) => None,
            (page, limit) => {
                let page = page.unwrap_or(1);
                let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
                Self::validate_pagination_param(page, "page")?;
                Self::validate_pagination_param(limit, "limit")?;
                if limit > MAX_PAGE_SIZE {
                    return Err(QueryError::new(format!(
                        "limit deve ser no máximo {}",
                        MAX_PAGE_SIZE
                    )));
                }
                Some((page, limit))
            }
        };

        Ok(ValidatedQuery {
            search: Self::normalize_string(params.search),
            min_price,
            max_price,
            sort_field,
            sort_order,
            pagination,
            ..ValidatedQuery::default()
        })
    }

    /// `buscar` ANDs the name and brand filters, unsorted beyond the default
    pub fn validate_search(params: SearchParams) -> ValidatedQuery {
        ValidatedQuery {
            name: Self::normalize_string(params.nome),
            brand: Self::normalize_string(params.marca),
            ..ValidatedQuery::default()
        }
    }

    /// Trims whitespace; empty strings become `None`
    fn normalize_string(s: Option<String>) -> Option<String> {
        s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }

    fn parse_price(raw: Option<String>, param_name: &str) -> Result<Option<Decimal>, QueryError> {
        let Some(raw) = Self::normalize_string(raw) else {
            return Ok(None);
        };
        let price = Decimal::from_str(&raw)
            .map_err(|_| QueryError::new(format!("{} deve ser um número válido", param_name)))?;
        if price < Decimal::ZERO {
            return Err(QueryError::new(format!("{} não pode ser negativo", param_name)));
        }
        Ok(Some(price))
    }

    fn parse_sort_field(s: &str) -> Result<SortField, QueryError> {
        match s.to_lowercase().as_str() {
            "nome" => Ok(SortField::Name),
            "preco" => Ok(SortField::Price),
            _ => Err(QueryError::new(format!(
                "Campo de ordenação inválido '{}'. Use 'nome' ou 'preco'",
                s
            ))),
        }
    }

    fn parse_sort_order(s: &str) -> Result<SortOrder, QueryError> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(QueryError::new(format!(
                "Ordem inválida '{}'. Use 'asc' ou 'desc'",
                s
            ))),
        }
    }

    fn validate_pagination_param(value: u32, param_name: &str) -> Result<(), QueryError> {
        if value == 0 {
            return Err(QueryError::new(format!("{} deve ser maior que zero", param_name)));
        }
        Ok(())
    }
}

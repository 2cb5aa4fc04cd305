use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldError};

/// Core product entity, as stored and as rendered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Materializes a validated create command with fresh id and timestamps.
    pub fn from_new(new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            category: new.category,
            stock: new.stock,
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the supplied fields of `patch` and bumps `updated_at`.
    pub fn apply(&mut self, patch: ProductPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        self.updated_at = next_updated_at(self.updated_at, now);
    }
}

/// `updated_at` must strictly increase even when the clock hasn't moved.
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

// ── Validated commands ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i32,
    pub image_url: Option<String>,
}

/// Partial update. `image_url: Some(None)` clears the URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub image_url: Option<Option<String>>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.stock.is_none()
            && self.image_url.is_none()
    }
}

/// One conjunct of a list filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Category(String),
    Search(String),
    MinPrice(f64),
    MaxPrice(f64),
}

impl Predicate {
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Predicate::Category(category) => product.category == *category,
            Predicate::Search(term) => {
                let term = term.to_lowercase();
                product.name.to_lowercase().contains(&term)
                    || product.description.to_lowercase().contains(&term)
            }
            Predicate::MinPrice(min) => product.price >= *min,
            Predicate::MaxPrice(max) => product.price <= *max,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub predicates: Vec<Predicate>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.predicates.iter().all(|p| p.matches(product))
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<i64>,
    pub image_url: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(self) -> AppResult<NewProduct> {
        let mut errors = Vec::new();

        let name = required_text("name", self.name, &mut errors);
        let description = required_text("description", self.description, &mut errors);
        let category = required_text("category", self.category, &mut errors);
        let price = match self.price {
            Some(price) => check_price(price, &mut errors),
            None => {
                errors.push(FieldError::new("price", "field required"));
                None
            }
        };
        let stock = match self.stock {
            Some(stock) => check_stock(stock, &mut errors),
            None => {
                errors.push(FieldError::new("stock", "field required"));
                None
            }
        };

        match (name, description, price, category, stock) {
            (Some(name), Some(description), Some(price), Some(category), Some(stock))
                if errors.is_empty() =>
            {
                Ok(NewProduct {
                    name,
                    description,
                    price,
                    category,
                    stock,
                    image_url: self.image_url,
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
}

impl UpdateProductRequest {
    pub fn validate(self) -> AppResult<ProductPatch> {
        let mut errors = Vec::new();

        let patch = ProductPatch {
            name: self.name.and_then(|v| non_empty("name", v, &mut errors)),
            description: self
                .description
                .and_then(|v| non_empty("description", v, &mut errors)),
            price: self.price.and_then(|v| check_price(v, &mut errors)),
            category: self.category.and_then(|v| non_empty("category", v, &mut errors)),
            stock: self.stock.and_then(|v| check_stock(v, &mut errors)),
            image_url: self.image_url,
        };

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        if patch.is_empty() {
            return Err(AppError::NoFieldsToUpdate);
        }
        Ok(patch)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl ListProductsQuery {
    pub fn validate(self) -> AppResult<ProductFilter> {
        let mut errors = Vec::new();
        let mut predicates = Vec::new();

        if let Some(category) = self.category.filter(|c| !c.is_empty()) {
            predicates.push(Predicate::Category(category));
        }
        if let Some(search) = self.search.filter(|s| !s.is_empty()) {
            predicates.push(Predicate::Search(search));
        }
        for (field, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            let Some(raw) = bound.filter(|b| !b.is_empty()) else {
                continue;
            };
            let Some(value) = parse_bound(field, &raw, &mut errors) else {
                continue;
            };
            predicates.push(if field == "min_price" {
                Predicate::MinPrice(value)
            } else {
                Predicate::MaxPrice(value)
            });
        }

        if errors.is_empty() {
            Ok(ProductFilter { predicates })
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

// ── Field checks ─────────────────────────────────────────────────────────────

/// Distinguishes an explicit `null` from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required_text(
    field: &str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        Some(value) => non_empty(field, value, errors),
        None => {
            errors.push(FieldError::new(field, "field required"));
            None
        }
    }
}

fn non_empty(field: &str, value: String, errors: &mut Vec<FieldError>) -> Option<String> {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
        None
    } else {
        Some(value)
    }
}

fn check_price(price: f64, errors: &mut Vec<FieldError>) -> Option<f64> {
    if !price.is_finite() {
        errors.push(FieldError::new("price", "must be a finite number"));
        None
    } else if price <= 0.0 {
        errors.push(FieldError::new("price", "must be greater than 0"));
        None
    } else {
        Some(price)
    }
}

fn parse_bound(field: &str, raw: &str, errors: &mut Vec<FieldError>) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if !value.is_finite() => {
            errors.push(FieldError::new(field, "must be a finite number"));
            None
        }
        Ok(value) if value < 0.0 => {
            errors.push(FieldError::new(field, "must be greater than or equal to 0"));
            None
        }
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(FieldError::new(field, "must be a number"));
            None
        }
    }
}

fn check_stock(stock: i64, errors: &mut Vec<FieldError>) -> Option<i32> {
    if stock < 0 {
        errors.push(FieldError::new("stock", "must be greater than or equal to 0"));
        return None;
    }
    match i32::try_from(stock) {
        Ok(stock) => Some(stock),
        Err(_) => {
            errors.push(FieldError::new("stock", "is too large"));
            None
        }
    }
}

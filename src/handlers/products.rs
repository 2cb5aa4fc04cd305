use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    extract::{AppJson, AppQuery},
    models::{CreateProductRequest, ListProductsQuery, UpdateProductRequest},
    AppState,
};

/// Ids that are not UUIDs can never match a product.
fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

pub async fn product_not_found() -> AppError {
    AppError::NotFound
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListProductsQuery>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let filter = query.validate()?;
    let products = state.store.list(&filter).await?;

    info!(
        count = products.len(),
        filters = filter.predicates.len(),
        "Listed products"
    );

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "total": products.len(),
            "products": products,
        })),
    ))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let new = payload.validate()?;
    let product = state.store.insert(new).await?;

    info!(id = %product.id, name = %product.name, "Created product");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Product created successfully",
            "product": product,
        })),
    ))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let id = parse_id(&id)?;
    let product = state.store.get(id).await?.ok_or(AppError::NotFound)?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "product": product }))))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let patch = payload.validate()?;
    let id = parse_id(&id)?;
    let product = state
        .store
        .update(id, patch)
        .await?
        .ok_or(AppError::NotFound)?;

    info!(id = %id, "Updated product");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Product updated successfully",
            "product": product,
        })),
    ))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let id = parse_id(&id)?;
    if !state.store.delete(id).await? {
        return Err(AppError::NotFound);
    }

    info!(id = %id, "Deleted product");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Product deleted successfully" })),
    ))
}

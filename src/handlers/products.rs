use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use super::{NAME_MAX_LEN, parse_id, require_non_negative, require_text};
use crate::{
    AppState,
    error::{AppError, AppResult, ErrorBody},
    models::{
        CreateProductRequest, MessageResponse, Product, UpdateProductRequest, UpdateStockRequest,
    },
};

fn require_stock(stock_quantity: i32) -> AppResult<()> {
    if stock_quantity < 0 {
        return Err(AppError::validation("Invalid data"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All products with their category", body = [Product]))
)]
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.repo.list_products().await?))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = Product),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody)
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id)?;
    let product = state
        .repo
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    Ok(Json(product))
}

#[utoipa::path(
    get,
    path = "/products/category/{category_id}",
    tag = "products",
    security(("bearer_auth" = [])),
    params(("category_id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Products of the category", body = [Product]),
        (status = 400, description = "Invalid category ID", body = ErrorBody),
        (status = 404, description = "Category not found", body = ErrorBody)
    )
)]
pub async fn list_products_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> AppResult<Json<Vec<Product>>> {
    let category_id = parse_id(&category_id)?;
    if state.repo.get_category(category_id).await?.is_none() {
        return Err(AppError::not_found("Category not found"));
    }
    Ok(Json(state.repo.list_products_by_category(category_id).await?))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    security(("bearer_auth" = [])),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid data or category not found", body = ErrorBody),
        (status = 409, description = "Product already exists", body = ErrorBody)
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    require_text(&payload.name, NAME_MAX_LEN)?;
    require_non_negative(payload.price)?;
    require_stock(payload.stock_quantity)?;

    if state.repo.get_category(payload.category_id).await?.is_none() {
        return Err(AppError::validation("Category not found"));
    }
    if state.repo.product_name_exists(&payload.name, None).await? {
        return Err(AppError::conflict("Product already exists"));
    }

    let product = state.repo.create_product(payload).await?;
    tracing::info!(product_id = product.id, category_id = product.category_id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// update_product
///
/// Partial update. A category change must point at an existing category.
#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "products",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = Product),
        (status = 400, description = "Invalid ID, data or category", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody),
        (status = 409, description = "Product name already exists", body = ErrorBody)
    )
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id)?;
    let Some(current) = state.repo.get_product(id).await? else {
        return Err(AppError::not_found("Product not found"));
    };
    let Json(payload) = payload?;

    if let Some(name) = &payload.name {
        require_text(name, NAME_MAX_LEN)?;
        if state.repo.product_name_exists(name, Some(id)).await? {
            return Err(AppError::conflict("Product name already exists"));
        }
    }
    if let Some(price) = payload.price {
        require_non_negative(price)?;
    }
    if let Some(stock_quantity) = payload.stock_quantity {
        require_stock(stock_quantity)?;
    }
    if let Some(category_id) = payload.category_id {
        if category_id != current.category_id && state.repo.get_category(category_id).await?.is_none() {
            return Err(AppError::validation("Category not found"));
        }
    }

    let product = state
        .repo
        .update_product(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    Ok(Json(product))
}

/// delete_product
///
/// Refused with 409 while options or menu entries still reference the product.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "products",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody),
        (status = 409, description = "Product still in use", body = ErrorBody)
    )
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if state.repo.get_product(id).await?.is_none() {
        return Err(AppError::not_found("Product not found"));
    }
    if state.repo.count_product_references(id).await? > 0 {
        return Err(AppError::conflict("Product still in use"));
    }

    if !state.repo.delete_product(id).await? {
        return Err(AppError::not_found("Product not found"));
    }
    tracing::info!(product_id = id, "product deleted");
    Ok(Json(MessageResponse::new("Product deleted")))
}

/// toggle_product_availability
///
/// Flips `is_available` and returns the refreshed product.
#[utoipa::path(
    patch,
    path = "/products/{id}/availability",
    tag = "products",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Availability toggled", body = Product),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody)
    )
)]
pub async fn toggle_product_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id)?;
    let Some(current) = state.repo.get_product(id).await? else {
        return Err(AppError::not_found("Product not found"));
    };

    let product = state
        .repo
        .set_product_availability(id, !current.is_available)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    tracing::info!(product_id = id, is_available = product.is_available, "product availability toggled");
    Ok(Json(product))
}

#[utoipa::path(
    patch,
    path = "/products/{id}/stock",
    tag = "products",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Product ID")),
    request_body = UpdateStockRequest,
    responses(
        (status = 200, description = "Stock updated", body = Product),
        (status = 400, description = "Invalid ID or stock", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody)
    )
)]
pub async fn update_product_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStockRequest>, JsonRejection>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id)?;
    if state.repo.get_product(id).await?.is_none() {
        return Err(AppError::not_found("Product not found"));
    }
    let Json(payload) = payload?;
    require_stock(payload.stock_quantity)?;

    let product = state
        .repo
        .set_product_stock(id, payload.stock_quantity)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    Ok(Json(product))
}

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use super::{NAME_MAX_LEN, parse_id, require_text};
use crate::{
    AppState,
    error::{AppError, AppResult, ErrorBody},
    models::{Category, CreateCategoryRequest, MessageResponse, UpdateCategoryRequest},
};

/// list_categories
///
/// Ordered by `display_order`, then id.
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_categories().await?))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category details", body = Category),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Category not found", body = ErrorBody)
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id)?;
    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    Ok(Json(category))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid data", body = ErrorBody),
        (status = 409, description = "Category already exists", body = ErrorBody)
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    require_text(&payload.name, NAME_MAX_LEN)?;

    if state.repo.category_name_exists(&payload.name, None).await? {
        return Err(AppError::conflict("Category already exists"));
    }

    let category = state.repo.create_category(payload).await?;
    tracing::info!(category_id = category.id, name = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated category", body = Category),
        (status = 400, description = "Invalid ID or data", body = ErrorBody),
        (status = 404, description = "Category not found", body = ErrorBody),
        (status = 409, description = "Category name already exists", body = ErrorBody)
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id)?;
    if state.repo.get_category(id).await?.is_none() {
        return Err(AppError::not_found("Category not found"));
    }
    let Json(payload) = payload?;

    if let Some(name) = &payload.name {
        require_text(name, NAME_MAX_LEN)?;
        if state.repo.category_name_exists(name, Some(id)).await? {
            return Err(AppError::conflict("Category name already exists"));
        }
    }

    let category = state
        .repo
        .update_category(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    Ok(Json(category))
}

/// delete_category
///
/// Refused with 409 while products still belong to the category.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Category not found", body = ErrorBody),
        (status = 409, description = "Category still in use", body = ErrorBody)
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if state.repo.get_category(id).await?.is_none() {
        return Err(AppError::not_found("Category not found"));
    }
    let products = state.repo.count_products_in_category(id).await?;
    if products > 0 {
        tracing::debug!(category_id = id, products, "category delete refused");
        return Err(AppError::conflict("Category still in use"));
    }

    if !state.repo.delete_category(id).await? {
        return Err(AppError::not_found("Category not found"));
    }
    tracing::info!(category_id = id, "category deleted");
    Ok(Json(MessageResponse::new("Category deleted")))
}

use std::collections::HashSet;

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
        CreateOptionRequest, CreateOptionValueRequest, MessageResponse, OptionValue, ProductOption,
        UpdateOptionRequest, UpdateOptionValueRequest,
    },
};

// --- Product options ---

#[utoipa::path(
    get,
    path = "/options",
    tag = "options",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All product options", body = [ProductOption]))
)]
pub async fn list_options(State(state): State<AppState>) -> AppResult<Json<Vec<ProductOption>>> {
    Ok(Json(state.repo.list_options().await?))
}

#[utoipa::path(
    get,
    path = "/options/{id}",
    tag = "options",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Option ID")),
    responses(
        (status = 200, description = "Option details", body = ProductOption),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Option not found", body = ErrorBody)
    )
)]
pub async fn get_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ProductOption>> {
    let id = parse_id(&id)?;
    let option = state
        .repo
        .get_option(id)
        .await?
        .ok_or_else(|| AppError::not_found("Option not found"))?;
    Ok(Json(option))
}

#[utoipa::path(
    get,
    path = "/options/product/{product_id}",
    tag = "options",
    security(("bearer_auth" = [])),
    params(("product_id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Options of the product", body = [ProductOption]),
        (status = 400, description = "Invalid product ID", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody)
    )
)]
pub async fn list_options_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> AppResult<Json<Vec<ProductOption>>> {
    let product_id = parse_id(&product_id)?;
    if state.repo.get_product(product_id).await?.is_none() {
        return Err(AppError::not_found("Product not found"));
    }
    Ok(Json(state.repo.list_options_by_product(product_id).await?))
}

#[utoipa::path(
    post,
    path = "/options",
    tag = "options",
    security(("bearer_auth" = [])),
    request_body = CreateOptionRequest,
    responses(
        (status = 201, description = "Option created", body = ProductOption),
        (status = 400, description = "Invalid data or product not found", body = ErrorBody),
        (status = 409, description = "Option already exists for this product", body = ErrorBody)
    )
)]
pub async fn create_option(
    State(state): State<AppState>,
    payload: Result<Json<CreateOptionRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    require_text(&payload.name, NAME_MAX_LEN)?;

    if state.repo.get_product(payload.product_id).await?.is_none() {
        return Err(AppError::validation("Product not found"));
    }
    if state
        .repo
        .option_name_exists(payload.product_id, &payload.name, None)
        .await?
    {
        return Err(AppError::conflict("Option already exists for this product"));
    }

    let option = state.repo.create_option(payload).await?;
    tracing::info!(option_id = option.id, product_id = option.product_id, "option created");
    Ok((StatusCode::CREATED, Json(option)))
}

/// update_option
///
/// Name uniqueness is checked against the effective product, which may be the
/// one the option is being moved to.
#[utoipa::path(
    put,
    path = "/options/{id}",
    tag = "options",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Option ID")),
    request_body = UpdateOptionRequest,
    responses(
        (status = 200, description = "Updated option", body = ProductOption),
        (status = 400, description = "Invalid ID, data or product", body = ErrorBody),
        (status = 404, description = "Option not found", body = ErrorBody),
        (status = 409, description = "Option name already exists for this product", body = ErrorBody)
    )
)]
pub async fn update_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOptionRequest>, JsonRejection>,
) -> AppResult<Json<ProductOption>> {
    let id = parse_id(&id)?;
    let Some(current) = state.repo.get_option(id).await? else {
        return Err(AppError::not_found("Option not found"));
    };
    let Json(payload) = payload?;

    let product_id = payload.product_id.unwrap_or(current.product_id);
    if product_id != current.product_id && state.repo.get_product(product_id).await?.is_none() {
        return Err(AppError::validation("Product not found"));
    }
    if let Some(name) = &payload.name {
        require_text(name, NAME_MAX_LEN)?;
    }
    let name = payload.name.as_deref().unwrap_or(&current.name);
    if state.repo.option_name_exists(product_id, name, Some(id)).await? {
        return Err(AppError::conflict("Option name already exists for this product"));
    }

    let option = state
        .repo
        .update_option(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Option not found"))?;
    Ok(Json(option))
}

/// delete_option
///
/// Refused with 409 while the option still has values.
#[utoipa::path(
    delete,
    path = "/options/{id}",
    tag = "options",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Option ID")),
    responses(
        (status = 200, description = "Option deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Option not found", body = ErrorBody),
        (status = 409, description = "Option still in use", body = ErrorBody)
    )
)]
pub async fn delete_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if state.repo.get_option(id).await?.is_none() {
        return Err(AppError::not_found("Option not found"));
    }
    if state.repo.count_option_values(id).await? > 0 {
        return Err(AppError::conflict("Option still in use"));
    }

    if !state.repo.delete_option(id).await? {
        return Err(AppError::not_found("Option not found"));
    }
    tracing::info!(option_id = id, "option deleted");
    Ok(Json(MessageResponse::new("Option deleted")))
}

// --- Option values ---

/// create_option_values
///
/// Accepts a JSON array. Every value is checked against the option's existing
/// values and against the rest of the batch before anything is written; the
/// batch is then stored atomically.
#[utoipa::path(
    post,
    path = "/options/{id}/values",
    tag = "option-values",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Option ID")),
    request_body = [CreateOptionValueRequest],
    responses(
        (status = 201, description = "Values created", body = [OptionValue]),
        (status = 400, description = "Invalid ID or data", body = ErrorBody),
        (status = 404, description = "Option not found", body = ErrorBody),
        (status = 409, description = "Value already exists for this option", body = ErrorBody)
    )
)]
pub async fn create_option_values(
    State(state): State<AppState>,
    Path(option_id): Path<String>,
    payload: Result<Json<Vec<CreateOptionValueRequest>>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let option_id = parse_id(&option_id)?;
    if state.repo.get_option(option_id).await?.is_none() {
        return Err(AppError::not_found("Option not found"));
    }
    let Json(values) =
        payload.map_err(|_| AppError::validation("Invalid data, expected an array of values"))?;
    if values.is_empty() {
        return Err(AppError::validation("Invalid data, expected an array of values"));
    }

    {
        let mut seen = HashSet::with_capacity(values.len());
        for value in &values {
            require_text(&value.value, NAME_MAX_LEN)?;
            require_non_negative(value.option_price)?;
            let duplicate = !seen.insert(value.value.as_str())
                || state.repo.option_value_exists(option_id, &value.value, None).await?;
            if duplicate {
                return Err(AppError::conflict(format!(
                    "Value '{}' already exists for this option",
                    value.value
                )));
            }
        }
    }

    let created = state.repo.create_option_values(option_id, values).await?;
    tracing::info!(option_id, count = created.len(), "option values created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/options/{id}/values",
    tag = "option-values",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Option ID")),
    responses(
        (status = 200, description = "Values of the option", body = [OptionValue]),
        (status = 400, description = "Invalid option ID", body = ErrorBody),
        (status = 404, description = "Option not found", body = ErrorBody)
    )
)]
pub async fn list_option_values(
    State(state): State<AppState>,
    Path(option_id): Path<String>,
) -> AppResult<Json<Vec<OptionValue>>> {
    let option_id = parse_id(&option_id)?;
    if state.repo.get_option(option_id).await?.is_none() {
        return Err(AppError::not_found("Option not found"));
    }
    Ok(Json(state.repo.list_option_values(option_id).await?))
}

#[utoipa::path(
    get,
    path = "/options/values/{id}",
    tag = "option-values",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Option Value ID")),
    responses(
        (status = 200, description = "Option value details", body = OptionValue),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Option value not found", body = ErrorBody)
    )
)]
pub async fn get_option_value(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<OptionValue>> {
    let id = parse_id(&id)?;
    let value = state
        .repo
        .get_option_value(id)
        .await?
        .ok_or_else(|| AppError::not_found("Option value not found"))?;
    Ok(Json(value))
}

#[utoipa::path(
    put,
    path = "/options/values/{id}",
    tag = "option-values",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Option Value ID")),
    request_body = UpdateOptionValueRequest,
    responses(
        (status = 200, description = "Updated option value", body = OptionValue),
        (status = 400, description = "Invalid ID, data or option", body = ErrorBody),
        (status = 404, description = "Option value not found", body = ErrorBody),
        (status = 409, description = "Value already exists for this option", body = ErrorBody)
    )
)]
pub async fn update_option_value(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOptionValueRequest>, JsonRejection>,
) -> AppResult<Json<OptionValue>> {
    let id = parse_id(&id)?;
    let Some(current) = state.repo.get_option_value(id).await? else {
        return Err(AppError::not_found("Option value not found"));
    };
    let Json(payload) = payload?;

    let option_id = payload.option_id.unwrap_or(current.option_id);
    if option_id != current.option_id && state.repo.get_option(option_id).await?.is_none() {
        return Err(AppError::validation("Option not found"));
    }
    if let Some(value) = &payload.value {
        require_text(value, NAME_MAX_LEN)?;
    }
    if let Some(price) = payload.option_price {
        require_non_negative(price)?;
    }
    let value = payload.value.as_deref().unwrap_or(&current.value);
    if state.repo.option_value_exists(option_id, value, Some(id)).await? {
        return Err(AppError::conflict("Value already exists for this option"));
    }

    let updated = state
        .repo
        .update_option_value(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Option value not found"))?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/options/values/{id}",
    tag = "option-values",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Option Value ID")),
    responses(
        (status = 200, description = "Option value deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Option value not found", body = ErrorBody)
    )
)]
pub async fn delete_option_value(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if !state.repo.delete_option_value(id).await? {
        return Err(AppError::not_found("Option value not found"));
    }
    tracing::info!(option_value_id = id, "option value deleted");
    Ok(Json(MessageResponse::new("Option value deleted")))
}

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use super::{LONG_TEXT_MAX_LEN, NAME_MAX_LEN, limit_text, parse_id, require_non_negative, require_text};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{
        AddMenuProductRequest, CreateMenuRequest, Menu, MenuProduct, MessageResponse,
        UpdateMenuProductRequest, UpdateMenuRequest,
    },
};

fn require_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::validation("Invalid data"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/menus",
    tag = "menus",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All menus with their products", body = [Menu]))
)]
pub async fn list_menus(State(state): State<AppState>) -> AppResult<Json<Vec<Menu>>> {
    Ok(Json(state.repo.list_menus().await?))
}

#[utoipa::path(
    get,
    path = "/menus/{id}",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Menu details", body = Menu),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Menu not found", body = ErrorBody)
    )
)]
pub async fn get_menu(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Menu>> {
    let id = parse_id(&id)?;
    let menu = state
        .repo
        .get_menu(id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu not found"))?;
    Ok(Json(menu))
}

#[utoipa::path(
    post,
    path = "/menus",
    tag = "menus",
    security(("bearer_auth" = [])),
    request_body = CreateMenuRequest,
    responses(
        (status = 201, description = "Menu created", body = Menu),
        (status = 400, description = "Invalid data", body = ErrorBody),
        (status = 409, description = "Menu already exists", body = ErrorBody)
    )
)]
pub async fn create_menu(
    State(state): State<AppState>,
    payload: Result<Json<CreateMenuRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    require_text(&payload.name, NAME_MAX_LEN)?;
    limit_text(&payload.description, LONG_TEXT_MAX_LEN)?;
    require_non_negative(payload.price)?;

    if state.repo.menu_name_exists(&payload.name, None).await? {
        return Err(AppError::conflict("Menu already exists"));
    }

    let menu = state.repo.create_menu(payload).await?;
    tracing::info!(menu_id = menu.id, name = %menu.name, "menu created");
    Ok((StatusCode::CREATED, Json(menu)))
}

#[utoipa::path(
    put,
    path = "/menus/{id}",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu ID")),
    request_body = UpdateMenuRequest,
    responses(
        (status = 200, description = "Updated menu", body = Menu),
        (status = 400, description = "Invalid ID or data", body = ErrorBody),
        (status = 404, description = "Menu not found", body = ErrorBody),
        (status = 409, description = "Menu name already exists", body = ErrorBody)
    )
)]
pub async fn update_menu(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMenuRequest>, JsonRejection>,
) -> AppResult<Json<Menu>> {
    let id = parse_id(&id)?;
    if state.repo.get_menu(id).await?.is_none() {
        return Err(AppError::not_found("Menu not found"));
    }
    let Json(payload) = payload?;

    if let Some(name) = &payload.name {
        require_text(name, NAME_MAX_LEN)?;
        if state.repo.menu_name_exists(name, Some(id)).await? {
            return Err(AppError::conflict("Menu name already exists"));
        }
    }
    if let Some(description) = &payload.description {
        limit_text(description, LONG_TEXT_MAX_LEN)?;
    }
    if let Some(price) = payload.price {
        require_non_negative(price)?;
    }

    let menu = state
        .repo
        .update_menu(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Menu not found"))?;
    Ok(Json(menu))
}

/// delete_menu
///
/// Removes the menu together with all of its entries. The products themselves
/// are untouched.
#[utoipa::path(
    delete,
    path = "/menus/{id}",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Menu deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Menu not found", body = ErrorBody)
    )
)]
pub async fn delete_menu(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if !state.repo.delete_menu(id).await? {
        return Err(AppError::not_found("Menu not found"));
    }
    tracing::info!(menu_id = id, actor, "menu deleted");
    Ok(Json(MessageResponse::new("Menu deleted")))
}

#[utoipa::path(
    patch,
    path = "/menus/{id}/availability",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Availability toggled", body = Menu),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Menu not found", body = ErrorBody)
    )
)]
pub async fn toggle_menu_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Menu>> {
    let id = parse_id(&id)?;
    let Some(current) = state.repo.get_menu(id).await? else {
        return Err(AppError::not_found("Menu not found"));
    };

    let menu = state
        .repo
        .set_menu_availability(id, !current.is_available)
        .await?
        .ok_or_else(|| AppError::not_found("Menu not found"))?;
    tracing::info!(menu_id = id, is_available = menu.is_available, "menu availability toggled");
    Ok(Json(menu))
}

// --- Menu entries ---

#[utoipa::path(
    post,
    path = "/menus/{id}/products",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu ID")),
    request_body = AddMenuProductRequest,
    responses(
        (status = 201, description = "Product added to menu", body = MenuProduct),
        (status = 400, description = "Invalid ID or data", body = ErrorBody),
        (status = 404, description = "Menu or product not found", body = ErrorBody),
        (status = 409, description = "Product already in menu", body = ErrorBody)
    )
)]
pub async fn add_product_to_menu(
    State(state): State<AppState>,
    Path(menu_id): Path<String>,
    payload: Result<Json<AddMenuProductRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let menu_id = parse_id(&menu_id)?;
    if state.repo.get_menu(menu_id).await?.is_none() {
        return Err(AppError::not_found("Menu not found"));
    }
    let Json(payload) = payload?;
    require_quantity(payload.quantity)?;

    if state.repo.get_product(payload.product_id).await?.is_none() {
        return Err(AppError::not_found("Product not found"));
    }
    if state.repo.menu_product_exists(menu_id, payload.product_id).await? {
        return Err(AppError::conflict("Product already in menu"));
    }

    let entry = state.repo.add_menu_product(menu_id, payload).await?;
    tracing::info!(menu_id, product_id = entry.product_id, "product added to menu");
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    get,
    path = "/menus/{id}/products",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Entries of the menu", body = [MenuProduct]),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Menu not found", body = ErrorBody)
    )
)]
pub async fn list_menu_products(
    State(state): State<AppState>,
    Path(menu_id): Path<String>,
) -> AppResult<Json<Vec<MenuProduct>>> {
    let menu_id = parse_id(&menu_id)?;
    if state.repo.get_menu(menu_id).await?.is_none() {
        return Err(AppError::not_found("Menu not found"));
    }
    Ok(Json(state.repo.list_menu_products(menu_id).await?))
}

#[utoipa::path(
    get,
    path = "/menus/products/{id}",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu Product ID")),
    responses(
        (status = 200, description = "Menu product details", body = MenuProduct),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Menu product not found", body = ErrorBody)
    )
)]
pub async fn get_menu_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MenuProduct>> {
    let id = parse_id(&id)?;
    let entry = state
        .repo
        .get_menu_product(id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu product not found"))?;
    Ok(Json(entry))
}

#[utoipa::path(
    put,
    path = "/menus/products/{id}",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu Product ID")),
    request_body = UpdateMenuProductRequest,
    responses(
        (status = 200, description = "Updated menu product", body = MenuProduct),
        (status = 400, description = "Invalid ID or data", body = ErrorBody),
        (status = 404, description = "Menu product not found", body = ErrorBody)
    )
)]
pub async fn update_menu_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMenuProductRequest>, JsonRejection>,
) -> AppResult<Json<MenuProduct>> {
    let id = parse_id(&id)?;
    if state.repo.get_menu_product(id).await?.is_none() {
        return Err(AppError::not_found("Menu product not found"));
    }
    let Json(payload) = payload?;
    if let Some(quantity) = payload.quantity {
        require_quantity(quantity)?;
    }

    let entry = state
        .repo
        .update_menu_product(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Menu product not found"))?;
    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/menus/products/{id}",
    tag = "menus",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Menu Product ID")),
    responses(
        (status = 200, description = "Product removed from menu", body = MessageResponse),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Menu product not found", body = ErrorBody)
    )
)]
pub async fn remove_menu_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if !state.repo.delete_menu_product(id).await? {
        return Err(AppError::not_found("Menu product not found"));
    }
    Ok(Json(MessageResponse::new("Product removed from menu")))
}

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use super::{LONG_TEXT_MAX_LEN, ROLE_NAME_MAX_LEN, limit_text, parse_id, require_text};
use crate::{
    AppState,
    error::{AppError, AppResult, ErrorBody},
    models::{CreateRoleRequest, MessageResponse, Role, UpdateRoleRequest},
};

#[utoipa::path(
    get,
    path = "/roles",
    tag = "roles",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All roles", body = [Role]))
)]
pub async fn list_roles(State(state): State<AppState>) -> AppResult<Json<Vec<Role>>> {
    Ok(Json(state.repo.list_roles().await?))
}

#[utoipa::path(
    get,
    path = "/roles/{id}",
    tag = "roles",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role details", body = Role),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Role not found", body = ErrorBody)
    )
)]
pub async fn get_role(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Role>> {
    let id = parse_id(&id)?;
    let role = state
        .repo
        .get_role(id)
        .await?
        .ok_or_else(|| AppError::not_found("Role not found"))?;
    Ok(Json(role))
}

#[utoipa::path(
    post,
    path = "/roles",
    tag = "roles",
    security(("bearer_auth" = [])),
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Invalid data", body = ErrorBody),
        (status = 409, description = "Role already exists", body = ErrorBody)
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    require_text(&payload.role_name, ROLE_NAME_MAX_LEN)?;
    limit_text(&payload.description, LONG_TEXT_MAX_LEN)?;

    if state.repo.role_name_exists(&payload.role_name, None).await? {
        return Err(AppError::conflict("Role already exists"));
    }

    let role = state.repo.create_role(payload).await?;
    tracing::info!(role_id = role.id, "role created");
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    put,
    path = "/roles/{id}",
    tag = "roles",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated role", body = Role),
        (status = 400, description = "Invalid ID or data", body = ErrorBody),
        (status = 404, description = "Role not found", body = ErrorBody),
        (status = 409, description = "Role already exists", body = ErrorBody)
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> AppResult<Json<Role>> {
    let id = parse_id(&id)?;
    if state.repo.get_role(id).await?.is_none() {
        return Err(AppError::not_found("Role not found"));
    }
    let Json(payload) = payload?;

    if let Some(name) = &payload.role_name {
        require_text(name, ROLE_NAME_MAX_LEN)?;
        if state.repo.role_name_exists(name, Some(id)).await? {
            return Err(AppError::conflict("Role already exists"));
        }
    }
    if let Some(description) = &payload.description {
        limit_text(description, LONG_TEXT_MAX_LEN)?;
    }

    let role = state
        .repo
        .update_role(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Role not found"))?;
    Ok(Json(role))
}

/// delete_role
///
/// Refused with 409 while any user still holds the role.
#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = "roles",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Role not found", body = ErrorBody),
        (status = 409, description = "Role still in use", body = ErrorBody)
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if state.repo.get_role(id).await?.is_none() {
        return Err(AppError::not_found("Role not found"));
    }
    if state.repo.count_users_with_role(id).await? > 0 {
        return Err(AppError::conflict("Role still in use"));
    }

    if !state.repo.delete_role(id).await? {
        return Err(AppError::not_found("Role not found"));
    }
    tracing::info!(role_id = id, "role deleted");
    Ok(Json(MessageResponse::new("Role deleted")))
}

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use super::{LONG_TEXT_MAX_LEN, NAME_MAX_LEN, limit_text, parse_id};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{
        LoginRequest, LoginResponse, MessageResponse, NewUser, RegisterUserRequest,
        UpdateUserRequest, User, UserChanges,
    },
    password::{hash_password, validate_password, verify_password},
};

const LOGIN_FAILED: &str = "Email or Password Invalid";

// Loose shape check: one '@', something on both sides, a dot in the domain.
fn is_valid_email(email: &str) -> bool {
    if email.chars().count() > LONG_TEXT_MAX_LEN {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !email.chars().any(char::is_whitespace)
}

/// Runs bcrypt on the blocking pool so a slow hash never stalls the runtime.
async fn hash_blocking(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| {
            tracing::error!("password hashing task failed: {:?}", e);
            AppError::Internal("Internal server error".to_string())
        })?
        .map_err(|e| {
            tracing::error!("password hashing failed: {:?}", e);
            AppError::Internal("Internal server error".to_string())
        })
}

async fn verify_blocking(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!("password verification task failed: {:?}", e);
            AppError::Internal("Internal server error".to_string())
        })
}

/// register_user
///
/// [Public Route] Creates an account. The password must satisfy the policy and
/// is stored only as a bcrypt hash.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User Created", body = User),
        (status = 400, description = "Invalid data, weak password or unknown role", body = ErrorBody),
        (status = 409, description = "Email Already in Use", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let email = payload.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid data"));
    }
    limit_text(&payload.username, NAME_MAX_LEN)?;
    validate_password(&payload.password)?;

    if state.repo.get_role(payload.roles_id).await?.is_none() {
        return Err(AppError::validation("Role not found"));
    }
    if state.repo.email_exists(&email, None).await? {
        return Err(AppError::conflict("Email Already in Use"));
    }

    let password_hash = hash_blocking(payload.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username.trim().to_string(),
            email,
            password_hash,
            roles_id: payload.roles_id,
        })
        .await?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Exchanges an email and password for a session token. Unknown
/// emails and wrong passwords produce the same answer.
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "JWT token", body = LoginResponse),
        (status = 400, description = "Invalid data", body = ErrorBody),
        (status = 401, description = "Email or Password Invalid", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(payload) = payload?;

    let Some(credentials) = state.repo.find_credentials(payload.email.trim()).await? else {
        tracing::debug!("login attempt for unknown email");
        return Err(AppError::unauthorized(LOGIN_FAILED));
    };

    let matches = verify_blocking(payload.password, credentials.password_hash).await?;
    if !matches || !credentials.is_active {
        tracing::debug!(user_id = credentials.id, "login rejected");
        return Err(AppError::unauthorized(LOGIN_FAILED));
    }

    let issued = state.tokens.issue(credentials.id).map_err(|e| {
        tracing::error!("token issuance failed: {}", e);
        AppError::Internal("Internal server error".to_string())
    })?;

    tracing::info!(user_id = credentials.id, "user logged in");
    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All users with their role", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<User>> {
    let id = parse_id(&id)?;
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user))
}

/// update_user
///
/// Partial update. A new password goes through the policy and is re-hashed; a
/// new email must stay unique; a new role must exist.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid ID or data", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Email Already in Use", body = ErrorBody)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    let id = parse_id(&id)?;
    if state.repo.get_user(id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }
    let Json(payload) = payload?;

    let email = payload.email.map(|e| e.trim().to_string());
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(AppError::validation("Invalid data"));
        }
        if state.repo.email_exists(email, Some(id)).await? {
            return Err(AppError::conflict("Email Already in Use"));
        }
    }
    if let Some(username) = &payload.username {
        limit_text(username, NAME_MAX_LEN)?;
    }
    if let Some(roles_id) = payload.roles_id {
        if state.repo.get_role(roles_id).await?.is_none() {
            return Err(AppError::validation("Role not found"));
        }
    }
    let password_hash = match payload.password {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_blocking(password, state.config.bcrypt_cost).await?)
        }
        None => None,
    };

    let changes = UserChanges {
        username: payload.username.map(|u| u.trim().to_string()),
        email,
        password_hash,
        roles_id: payload.roles_id,
        is_active: payload.is_active,
    };
    let user = state
        .repo
        .update_user(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if !state.repo.delete_user(id).await? {
        return Err(AppError::not_found("User not found"));
    }
    tracing::info!(user_id = id, actor, "user deleted");
    Ok(Json(MessageResponse::new("User deleted")))
}


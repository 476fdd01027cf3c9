use crate::{AppState, handlers::users};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// The only endpoints an anonymous client may call.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers; never touches the database.
        .route("/health", get(|| async { "ok" }))
        // POST /users
        // Account registration. Roles are seeded by the migration so the very
        // first account can be created here.
        .route("/users", post(users::register_user))
        // POST /users/login
        // Exchanges credentials for a two-hour session token.
        .route("/users/login", post(users::login))
}

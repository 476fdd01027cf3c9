use std::time::Duration;

use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod rate_limit;
pub mod repository;

// Routing segregated by access level (public, authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::TokenService;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use rate_limit::RateLimitState;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::register_user, handlers::users::login, handlers::users::list_users,
        handlers::users::get_user, handlers::users::update_user, handlers::users::delete_user,
        handlers::roles::list_roles, handlers::roles::get_role, handlers::roles::create_role,
        handlers::roles::update_role, handlers::roles::delete_role,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::products::list_products, handlers::products::get_product,
        handlers::products::list_products_by_category, handlers::products::create_product,
        handlers::products::update_product, handlers::products::delete_product,
        handlers::products::toggle_product_availability, handlers::products::update_product_stock,
        handlers::options::list_options, handlers::options::get_option,
        handlers::options::list_options_by_product, handlers::options::create_option,
        handlers::options::update_option, handlers::options::delete_option,
        handlers::options::create_option_values, handlers::options::list_option_values,
        handlers::options::get_option_value, handlers::options::update_option_value,
        handlers::options::delete_option_value,
        handlers::menus::list_menus, handlers::menus::get_menu, handlers::menus::create_menu,
        handlers::menus::update_menu, handlers::menus::delete_menu,
        handlers::menus::toggle_menu_availability, handlers::menus::add_product_to_menu,
        handlers::menus::list_menu_products, handlers::menus::get_menu_product,
        handlers::menus::update_menu_product, handlers::menus::remove_menu_product,
    ),
    components(
        schemas(
            models::Role, models::CreateRoleRequest, models::UpdateRoleRequest,
            models::User, models::RegisterUserRequest, models::UpdateUserRequest,
            models::LoginRequest, models::LoginResponse,
            models::Category, models::CreateCategoryRequest, models::UpdateCategoryRequest,
            models::Product, models::CreateProductRequest, models::UpdateProductRequest,
            models::UpdateStockRequest, models::SelectionMode,
            models::ProductOption, models::CreateOptionRequest, models::UpdateOptionRequest,
            models::OptionValue, models::CreateOptionValueRequest, models::UpdateOptionValueRequest,
            models::Menu, models::CreateMenuRequest, models::UpdateMenuRequest,
            models::MenuProduct, models::AddMenuProductRequest, models::UpdateMenuProductRequest,
            models::MessageResponse, error::ErrorBody,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "users", description = "Accounts and login"),
        (name = "roles", description = "Role management"),
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Catalog products"),
        (name = "options", description = "Product options"),
        (name = "option-values", description = "Values of product options"),
        (name = "menus", description = "Menus and their products")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// The single shared container handed to every handler. Cloning is cheap:
/// the repository and limiter sit behind `Arc`s and the token keys are shared.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub tokens: TokenService,
    pub config: AppConfig,
    pub limiter: RateLimitState,
}

impl AppState {
    /// Assembles the state from a repository and a configuration, deriving the
    /// token service and rate limiter from the latter.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: TokenService::with_default_ttl(&config.jwt_secret),
            limiter: rate_limit::new_limiter(config.rate_limit_rps),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

/// auth_middleware
///
/// Gate for the authenticated routes. Extracting `AuthUser` rejects the request
/// with 401 before the handler runs; on success the identity is stored in the
/// request extensions.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60))
}

/// create_router
///
/// Assembles the routing tree, the auth gate on protected routes, the global
/// rate limit and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let limiter = state.limiter.clone();

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // route_layer: the gate only runs for requests that matched a protected route.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .with_state(state);

    base_router
        .layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, uri and the correlation id, so every
/// log line of one request can be grouped.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

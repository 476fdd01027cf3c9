use crate::{
    AppState,
    handlers::{categories, menus, options, products, roles, users},
};
use axum::{
    Router,
    routing::{get, patch},
};

/// Authenticated Router Module
///
/// Every catalog operation. The router returned here is wrapped in the
/// `auth_middleware` layer by `create_router`, so handlers can rely on a
/// resolved `AuthUser` being present.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Users ---
        // POST /users stays public (registration); the GET shares the path.
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // --- Roles ---
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/roles/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        // --- Categories ---
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // --- Products ---
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        // Static segment wins over `{id}` at the same depth.
        .route(
            "/products/category/{category_id}",
            get(products::list_products_by_category),
        )
        .route(
            "/products/{id}/availability",
            patch(products::toggle_product_availability),
        )
        .route("/products/{id}/stock", patch(products::update_product_stock))
        // --- Options & option values ---
        .route("/options", get(options::list_options).post(options::create_option))
        .route(
            "/options/{id}",
            get(options::get_option)
                .put(options::update_option)
                .delete(options::delete_option),
        )
        .route(
            "/options/product/{product_id}",
            get(options::list_options_by_product),
        )
        .route(
            "/options/{id}/values",
            get(options::list_option_values).post(options::create_option_values),
        )
        .route(
            "/options/values/{id}",
            get(options::get_option_value)
                .put(options::update_option_value)
                .delete(options::delete_option_value),
        )
        // --- Menus & menu entries ---
        .route("/menus", get(menus::list_menus).post(menus::create_menu))
        .route(
            "/menus/{id}",
            get(menus::get_menu)
                .put(menus::update_menu)
                .delete(menus::delete_menu),
        )
        .route(
            "/menus/{id}/availability",
            patch(menus::toggle_menu_availability),
        )
        .route(
            "/menus/{id}/products",
            get(menus::list_menu_products).post(menus::add_product_to_menu),
        )
        .route(
            "/menus/products/{id}",
            get(menus::get_menu_product)
                .put(menus::update_menu_product)
                .delete(menus::remove_menu_product),
        )
}

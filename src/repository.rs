use crate::error::AppResult;
use crate::models::{
    AddMenuProductRequest, Category, CreateCategoryRequest, CreateMenuRequest, CreateOptionRequest,
    CreateOptionValueRequest, CreateProductRequest, CreateRoleRequest, Menu, MenuProduct, NewUser,
    OptionValue, Product, ProductOption, Role, UpdateCategoryRequest, UpdateMenuProductRequest,
    UpdateMenuRequest, UpdateOptionRequest, UpdateOptionValueRequest, UpdateProductRequest,
    UpdateRoleRequest, User, UserChanges, UserCredentials,
};
use async_trait::async_trait;
use std::sync::Arc;

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// Abstract contract for every persistence operation, so handlers never see
/// the concrete store. `Send + Sync + async_trait` make `Arc<dyn Repository>`
/// shareable across Axum's task boundaries.
///
/// Conventions:
/// - `get_*` returns `Ok(None)` when the row does not exist.
/// - `*_exists(.., exclude)` checks a uniqueness scope, ignoring the row `exclude`
///   so an update can keep its own name.
/// - `update_*` applies only the `Some` fields and returns `Ok(None)` when the
///   target vanished.
/// - `delete_*` returns `Ok(false)` when nothing was deleted.
/// - Storage-level uniqueness or reference violations surface as `AppError::Conflict`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Roles ---
    async fn list_roles(&self) -> AppResult<Vec<Role>>;
    async fn get_role(&self, id: i64) -> AppResult<Option<Role>>;
    async fn role_name_exists(&self, role_name: &str, exclude: Option<i64>) -> AppResult<bool>;
    async fn create_role(&self, req: CreateRoleRequest) -> AppResult<Role>;
    async fn update_role(&self, id: i64, req: UpdateRoleRequest) -> AppResult<Option<Role>>;
    async fn count_users_with_role(&self, role_id: i64) -> AppResult<i64>;
    async fn delete_role(&self, id: i64) -> AppResult<bool>;

    // --- Users (role eagerly loaded) ---
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>>;
    async fn email_exists(&self, email: &str, exclude: Option<i64>) -> AppResult<bool>;
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> AppResult<bool>;

    // --- Categories ---
    async fn list_categories(&self) -> AppResult<Vec<Category>>;
    async fn get_category(&self, id: i64) -> AppResult<Option<Category>>;
    async fn category_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool>;
    async fn create_category(&self, req: CreateCategoryRequest) -> AppResult<Category>;
    async fn update_category(&self, id: i64, req: UpdateCategoryRequest) -> AppResult<Option<Category>>;
    async fn count_products_in_category(&self, category_id: i64) -> AppResult<i64>;
    async fn delete_category(&self, id: i64) -> AppResult<bool>;

    // --- Products (category eagerly loaded) ---
    async fn list_products(&self) -> AppResult<Vec<Product>>;
    async fn list_products_by_category(&self, category_id: i64) -> AppResult<Vec<Product>>;
    async fn get_product(&self, id: i64) -> AppResult<Option<Product>>;
    async fn product_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool>;
    async fn create_product(&self, req: CreateProductRequest) -> AppResult<Product>;
    async fn update_product(&self, id: i64, req: UpdateProductRequest) -> AppResult<Option<Product>>;
    async fn set_product_availability(&self, id: i64, is_available: bool) -> AppResult<Option<Product>>;
    async fn set_product_stock(&self, id: i64, stock_quantity: i32) -> AppResult<Option<Product>>;
    /// Options plus menu entries pointing at the product.
    async fn count_product_references(&self, product_id: i64) -> AppResult<i64>;
    async fn delete_product(&self, id: i64) -> AppResult<bool>;

    // --- Product options ---
    async fn list_options(&self) -> AppResult<Vec<ProductOption>>;
    async fn list_options_by_product(&self, product_id: i64) -> AppResult<Vec<ProductOption>>;
    async fn get_option(&self, id: i64) -> AppResult<Option<ProductOption>>;
    async fn option_name_exists(&self, product_id: i64, name: &str, exclude: Option<i64>) -> AppResult<bool>;
    async fn create_option(&self, req: CreateOptionRequest) -> AppResult<ProductOption>;
    async fn update_option(&self, id: i64, req: UpdateOptionRequest) -> AppResult<Option<ProductOption>>;
    async fn count_option_values(&self, option_id: i64) -> AppResult<i64>;
    async fn delete_option(&self, id: i64) -> AppResult<bool>;

    // --- Option values ---
    async fn list_option_values(&self, option_id: i64) -> AppResult<Vec<OptionValue>>;
    async fn get_option_value(&self, id: i64) -> AppResult<Option<OptionValue>>;
    async fn option_value_exists(&self, option_id: i64, value: &str, exclude: Option<i64>) -> AppResult<bool>;
    /// Inserts the whole batch or nothing.
    async fn create_option_values(
        &self,
        option_id: i64,
        values: Vec<CreateOptionValueRequest>,
    ) -> AppResult<Vec<OptionValue>>;
    async fn update_option_value(&self, id: i64, req: UpdateOptionValueRequest) -> AppResult<Option<OptionValue>>;
    async fn delete_option_value(&self, id: i64) -> AppResult<bool>;

    // --- Menus (entries eagerly loaded) ---
    async fn list_menus(&self) -> AppResult<Vec<Menu>>;
    async fn get_menu(&self, id: i64) -> AppResult<Option<Menu>>;
    async fn menu_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool>;
    async fn create_menu(&self, req: CreateMenuRequest) -> AppResult<Menu>;
    async fn update_menu(&self, id: i64, req: UpdateMenuRequest) -> AppResult<Option<Menu>>;
    async fn set_menu_availability(&self, id: i64, is_available: bool) -> AppResult<Option<Menu>>;
    /// Also removes every entry of the menu.
    async fn delete_menu(&self, id: i64) -> AppResult<bool>;

    // --- Menu entries ---
    async fn list_menu_products(&self, menu_id: i64) -> AppResult<Vec<MenuProduct>>;
    async fn get_menu_product(&self, id: i64) -> AppResult<Option<MenuProduct>>;
    async fn menu_product_exists(&self, menu_id: i64, product_id: i64) -> AppResult<bool>;
    async fn add_menu_product(&self, menu_id: i64, req: AddMenuProductRequest) -> AppResult<MenuProduct>;
    async fn update_menu_product(
        &self,
        id: i64,
        req: UpdateMenuProductRequest,
    ) -> AppResult<Option<MenuProduct>>;
    async fn delete_menu_product(&self, id: i64) -> AppResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use super::Repository;
use crate::error::AppResult;
use crate::models::{
    AddMenuProductRequest, Category, CreateCategoryRequest, CreateMenuRequest, CreateOptionRequest,
    CreateOptionValueRequest, CreateProductRequest, CreateRoleRequest, Menu, MenuProduct, NewUser,
    OptionValue, Product, ProductOption, Role, UpdateCategoryRequest, UpdateMenuProductRequest,
    UpdateMenuRequest, UpdateOptionRequest, UpdateOptionValueRequest, UpdateProductRequest,
    UpdateRoleRequest, User, UserChanges, UserCredentials,
};

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Partial updates use `COALESCE` so a `None` field keeps the stored value.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the role of every user in one round trip.
    async fn attach_roles(&self, mut users: Vec<User>) -> AppResult<Vec<User>> {
        let ids: Vec<i64> = users.iter().map(|u| u.roles_id).collect();
        let roles: HashMap<i64, Role> = sqlx::query_as::<_, Role>(
            "SELECT id, role_name, description, permissions, created_at, updated_at FROM roles WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

        for user in &mut users {
            user.role = roles.get(&user.roles_id).cloned();
        }
        Ok(users)
    }

    /// Loads the category of every product in one round trip.
    async fn attach_categories(&self, mut products: Vec<Product>) -> AppResult<Vec<Product>> {
        let ids: Vec<i64> = products.iter().map(|p| p.category_id).collect();
        let categories: HashMap<i64, Category> = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, display_order, image_url, created_at, updated_at FROM categories WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

        for product in &mut products {
            product.category = categories.get(&product.category_id).cloned();
        }
        Ok(products)
    }

    /// Loads the ordered entries of every menu in one round trip.
    async fn attach_menu_products(&self, mut menus: Vec<Menu>) -> AppResult<Vec<Menu>> {
        let ids: Vec<i64> = menus.iter().map(|m| m.id).collect();
        let entries = sqlx::query_as::<_, MenuProduct>(
            "SELECT id, menu_id, product_id, quantity, is_optional, display_order FROM menu_products WHERE menu_id = ANY($1) ORDER BY display_order, id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_menu: HashMap<i64, Vec<MenuProduct>> = HashMap::new();
        for entry in entries {
            by_menu.entry(entry.menu_id).or_default().push(entry);
        }
        for menu in &mut menus {
            menu.menu_products = by_menu.remove(&menu.id).unwrap_or_default();
        }
        Ok(menus)
    }

    async fn attach_role(&self, user: Option<User>) -> AppResult<Option<User>> {
        match user {
            Some(u) => Ok(self.attach_roles(vec![u]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn attach_category(&self, product: Option<Product>) -> AppResult<Option<Product>> {
        match product {
            Some(p) => Ok(self.attach_categories(vec![p]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn attach_entries(&self, menu: Option<Menu>) -> AppResult<Option<Menu>> {
        match menu {
            Some(m) => Ok(self.attach_menu_products(vec![m]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- ROLES ---

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, role_name, description, permissions, created_at, updated_at FROM roles ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn get_role(&self, id: i64) -> AppResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, role_name, description, permissions, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn role_name_exists(&self, role_name: &str, exclude: Option<i64>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE role_name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(role_name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_role(&self, req: CreateRoleRequest) -> AppResult<Role> {
        let role = sqlx::query_as::<_, Role>(
            r#"INSERT INTO roles (role_name, description, permissions)
               VALUES ($1, $2, $3)
               RETURNING id, role_name, description, permissions, created_at, updated_at"#,
        )
        .bind(req.role_name)
        .bind(req.description)
        .bind(req.permissions)
        .fetch_one(&self.pool)
        .await?;
        Ok(role)
    }

    async fn update_role(&self, id: i64, req: UpdateRoleRequest) -> AppResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"UPDATE roles
               SET role_name = COALESCE($2, role_name),
                   description = COALESCE($3, description),
                   permissions = COALESCE($4, permissions),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, role_name, description, permissions, created_at, updated_at"#,
        )
        .bind(id)
        .bind(req.role_name)
        .bind(req.description)
        .bind(req.permissions)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn count_users_with_role(&self, role_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE roles_id = $1")
            .bind(role_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_role(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- USERS ---

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, email, roles_id, is_active, created_at, updated_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_roles(users).await
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, roles_id, is_active, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_role(user).await
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password_hash, is_active FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credentials)
    }

    async fn email_exists(&self, email: &str, exclude: Option<i64>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, email, password_hash, roles_id)
               VALUES ($1, $2, $3, $4)
               RETURNING id, username, email, roles_id, is_active, created_at, updated_at"#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.roles_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(self.attach_roles(vec![created]).await?.remove(0))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET username = COALESCE($2, username),
                   email = COALESCE($3, email),
                   password_hash = COALESCE($4, password_hash),
                   roles_id = COALESCE($5, roles_id),
                   is_active = COALESCE($6, is_active),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, username, email, roles_id, is_active, created_at, updated_at"#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.roles_id)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_role(user).await
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, display_order, image_url, created_at, updated_at FROM categories ORDER BY display_order, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, display_order, image_url, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn category_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> AppResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (name, description, display_order, image_url)
               VALUES ($1, $2, $3, $4)
               RETURNING id, name, description, display_order, image_url, created_at, updated_at"#,
        )
        .bind(req.name)
        .bind(req.description)
        .bind(req.display_order)
        .bind(req.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(&self, id: i64, req: UpdateCategoryRequest) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"UPDATE categories
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   display_order = COALESCE($4, display_order),
                   image_url = COALESCE($5, image_url),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, description, display_order, image_url, created_at, updated_at"#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.display_order)
        .bind(req.image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn count_products_in_category(&self, category_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_category(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- PRODUCTS ---

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"SELECT id, category_id, name, description, price, stock_quantity, is_available,
                      preparation_time, created_at, updated_at
               FROM products ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_categories(products).await
    }

    async fn list_products_by_category(&self, category_id: i64) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"SELECT id, category_id, name, description, price, stock_quantity, is_available,
                      preparation_time, created_at, updated_at
               FROM products WHERE category_id = $1 ORDER BY id"#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_categories(products).await
    }

    async fn get_product(&self, id: i64) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"SELECT id, category_id, name, description, price, stock_quantity, is_available,
                      preparation_time, created_at, updated_at
               FROM products WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_category(product).await
    }

    async fn product_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_product(&self, req: CreateProductRequest) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"INSERT INTO products (category_id, name, description, price, stock_quantity, is_available, preparation_time)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, category_id, name, description, price, stock_quantity, is_available,
                         preparation_time, created_at, updated_at"#,
        )
        .bind(req.category_id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.price)
        .bind(req.stock_quantity)
        .bind(req.is_available)
        .bind(req.preparation_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(self.attach_categories(vec![product]).await?.remove(0))
    }

    async fn update_product(&self, id: i64, req: UpdateProductRequest) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"UPDATE products
               SET category_id = COALESCE($2, category_id),
                   name = COALESCE($3, name),
                   description = COALESCE($4, description),
                   price = COALESCE($5, price),
                   stock_quantity = COALESCE($6, stock_quantity),
                   is_available = COALESCE($7, is_available),
                   preparation_time = COALESCE($8, preparation_time),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, category_id, name, description, price, stock_quantity, is_available,
                         preparation_time, created_at, updated_at"#,
        )
        .bind(id)
        .bind(req.category_id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.price)
        .bind(req.stock_quantity)
        .bind(req.is_available)
        .bind(req.preparation_time)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_category(product).await
    }

    async fn set_product_availability(&self, id: i64, is_available: bool) -> AppResult<Option<Product>> {
        self.update_product(
            id,
            UpdateProductRequest {
                is_available: Some(is_available),
                ..UpdateProductRequest::default()
            },
        )
        .await
    }

    async fn set_product_stock(&self, id: i64, stock_quantity: i32) -> AppResult<Option<Product>> {
        self.update_product(
            id,
            UpdateProductRequest {
                stock_quantity: Some(stock_quantity),
                ..UpdateProductRequest::default()
            },
        )
        .await
    }

    async fn count_product_references(&self, product_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT (SELECT COUNT(*) FROM product_options WHERE product_id = $1)
                    + (SELECT COUNT(*) FROM menu_products WHERE product_id = $1)"#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete_product(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- PRODUCT OPTIONS ---

    async fn list_options(&self) -> AppResult<Vec<ProductOption>> {
        let options = sqlx::query_as::<_, ProductOption>(
            "SELECT id, product_id, name, selection_mode, is_required FROM product_options ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    async fn list_options_by_product(&self, product_id: i64) -> AppResult<Vec<ProductOption>> {
        let options = sqlx::query_as::<_, ProductOption>(
            "SELECT id, product_id, name, selection_mode, is_required FROM product_options WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    async fn get_option(&self, id: i64) -> AppResult<Option<ProductOption>> {
        let option = sqlx::query_as::<_, ProductOption>(
            "SELECT id, product_id, name, selection_mode, is_required FROM product_options WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(option)
    }

    async fn option_name_exists(&self, product_id: i64, name: &str, exclude: Option<i64>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM product_options
                   WHERE product_id = $1 AND name = $2 AND ($3::BIGINT IS NULL OR id <> $3))"#,
        )
        .bind(product_id)
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_option(&self, req: CreateOptionRequest) -> AppResult<ProductOption> {
        let option = sqlx::query_as::<_, ProductOption>(
            r#"INSERT INTO product_options (product_id, name, selection_mode, is_required)
               VALUES ($1, $2, $3, $4)
               RETURNING id, product_id, name, selection_mode, is_required"#,
        )
        .bind(req.product_id)
        .bind(req.name)
        .bind(req.selection_mode.as_str())
        .bind(req.is_required)
        .fetch_one(&self.pool)
        .await?;
        Ok(option)
    }

    async fn update_option(&self, id: i64, req: UpdateOptionRequest) -> AppResult<Option<ProductOption>> {
        let option = sqlx::query_as::<_, ProductOption>(
            r#"UPDATE product_options
               SET product_id = COALESCE($2, product_id),
                   name = COALESCE($3, name),
                   selection_mode = COALESCE($4, selection_mode),
                   is_required = COALESCE($5, is_required)
               WHERE id = $1
               RETURNING id, product_id, name, selection_mode, is_required"#,
        )
        .bind(id)
        .bind(req.product_id)
        .bind(req.name)
        .bind(req.selection_mode.map(|mode| mode.as_str()))
        .bind(req.is_required)
        .fetch_optional(&self.pool)
        .await?;
        Ok(option)
    }

    async fn count_option_values(&self, option_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM option_values WHERE option_id = $1")
            .bind(option_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_option(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM product_options WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- OPTION VALUES ---

    async fn list_option_values(&self, option_id: i64) -> AppResult<Vec<OptionValue>> {
        let values = sqlx::query_as::<_, OptionValue>(
            "SELECT id, option_id, value, option_price FROM option_values WHERE option_id = $1 ORDER BY id",
        )
        .bind(option_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    async fn get_option_value(&self, id: i64) -> AppResult<Option<OptionValue>> {
        let value = sqlx::query_as::<_, OptionValue>(
            "SELECT id, option_id, value, option_price FROM option_values WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn option_value_exists(&self, option_id: i64, value: &str, exclude: Option<i64>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM option_values
                   WHERE option_id = $1 AND value = $2 AND ($3::BIGINT IS NULL OR id <> $3))"#,
        )
        .bind(option_id)
        .bind(value)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// create_option_values
    ///
    /// Inserts the batch inside one transaction; a failure on any row rolls back
    /// the rows inserted before it.
    async fn create_option_values(
        &self,
        option_id: i64,
        values: Vec<CreateOptionValueRequest>,
    ) -> AppResult<Vec<OptionValue>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(values.len());

        for value in values {
            let row = sqlx::query_as::<_, OptionValue>(
                r#"INSERT INTO option_values (option_id, value, option_price)
                   VALUES ($1, $2, $3)
                   RETURNING id, option_id, value, option_price"#,
            )
            .bind(option_id)
            .bind(value.value)
            .bind(value.option_price)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update_option_value(&self, id: i64, req: UpdateOptionValueRequest) -> AppResult<Option<OptionValue>> {
        let value = sqlx::query_as::<_, OptionValue>(
            r#"UPDATE option_values
               SET option_id = COALESCE($2, option_id),
                   value = COALESCE($3, value),
                   option_price = COALESCE($4, option_price)
               WHERE id = $1
               RETURNING id, option_id, value, option_price"#,
        )
        .bind(id)
        .bind(req.option_id)
        .bind(req.value)
        .bind(req.option_price)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn delete_option_value(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM option_values WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- MENUS ---

    async fn list_menus(&self) -> AppResult<Vec<Menu>> {
        let menus = sqlx::query_as::<_, Menu>(
            "SELECT id, name, description, price, is_available, created_at, updated_at FROM menus ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_menu_products(menus).await
    }

    async fn get_menu(&self, id: i64) -> AppResult<Option<Menu>> {
        let menu = sqlx::query_as::<_, Menu>(
            "SELECT id, name, description, price, is_available, created_at, updated_at FROM menus WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_entries(menu).await
    }

    async fn menu_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM menus WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_menu(&self, req: CreateMenuRequest) -> AppResult<Menu> {
        // A fresh menu has no entries, so nothing to attach.
        let menu = sqlx::query_as::<_, Menu>(
            r#"INSERT INTO menus (name, description, price, is_available)
               VALUES ($1, $2, $3, $4)
               RETURNING id, name, description, price, is_available, created_at, updated_at"#,
        )
        .bind(req.name)
        .bind(req.description)
        .bind(req.price)
        .bind(req.is_available)
        .fetch_one(&self.pool)
        .await?;
        Ok(menu)
    }

    async fn update_menu(&self, id: i64, req: UpdateMenuRequest) -> AppResult<Option<Menu>> {
        let menu = sqlx::query_as::<_, Menu>(
            r#"UPDATE menus
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   price = COALESCE($4, price),
                   is_available = COALESCE($5, is_available),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, description, price, is_available, created_at, updated_at"#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.price)
        .bind(req.is_available)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_entries(menu).await
    }

    async fn set_menu_availability(&self, id: i64, is_available: bool) -> AppResult<Option<Menu>> {
        self.update_menu(
            id,
            UpdateMenuRequest {
                is_available: Some(is_available),
                ..UpdateMenuRequest::default()
            },
        )
        .await
    }

    /// delete_menu
    ///
    /// Entries go with the menu through `ON DELETE CASCADE`.
    async fn delete_menu(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- MENU ENTRIES ---

    async fn list_menu_products(&self, menu_id: i64) -> AppResult<Vec<MenuProduct>> {
        let entries = sqlx::query_as::<_, MenuProduct>(
            r#"SELECT id, menu_id, product_id, quantity, is_optional, display_order
               FROM menu_products WHERE menu_id = $1 ORDER BY display_order, id"#,
        )
        .bind(menu_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn get_menu_product(&self, id: i64) -> AppResult<Option<MenuProduct>> {
        let entry = sqlx::query_as::<_, MenuProduct>(
            "SELECT id, menu_id, product_id, quantity, is_optional, display_order FROM menu_products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn menu_product_exists(&self, menu_id: i64, product_id: i64) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM menu_products WHERE menu_id = $1 AND product_id = $2)",
        )
        .bind(menu_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn add_menu_product(&self, menu_id: i64, req: AddMenuProductRequest) -> AppResult<MenuProduct> {
        let entry = sqlx::query_as::<_, MenuProduct>(
            r#"INSERT INTO menu_products (menu_id, product_id, quantity, is_optional, display_order)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, menu_id, product_id, quantity, is_optional, display_order"#,
        )
        .bind(menu_id)
        .bind(req.product_id)
        .bind(req.quantity)
        .bind(req.is_optional)
        .bind(req.display_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn update_menu_product(
        &self,
        id: i64,
        req: UpdateMenuProductRequest,
    ) -> AppResult<Option<MenuProduct>> {
        let entry = sqlx::query_as::<_, MenuProduct>(
            r#"UPDATE menu_products
               SET quantity = COALESCE($2, quantity),
                   is_optional = COALESCE($3, is_optional),
                   display_order = COALESCE($4, display_order)
               WHERE id = $1
               RETURNING id, menu_id, product_id, quantity, is_optional, display_order"#,
        )
        .bind(id)
        .bind(req.quantity)
        .bind(req.is_optional)
        .bind(req.display_order)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn delete_menu_product(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM menu_products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

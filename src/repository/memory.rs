use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::Repository;
use crate::error::{AppError, AppResult};
use crate::models::{
    AddMenuProductRequest, Category, CreateCategoryRequest, CreateMenuRequest, CreateOptionRequest,
    CreateOptionValueRequest, CreateProductRequest, CreateRoleRequest, Menu, MenuProduct, NewUser,
    OptionValue, Product, ProductOption, Role, UpdateCategoryRequest, UpdateMenuProductRequest,
    UpdateMenuRequest, UpdateOptionRequest, UpdateOptionValueRequest, UpdateProductRequest,
    UpdateRoleRequest, User, UserChanges, UserCredentials,
};

/// Stored user row, including the hash the public `User` never carries.
#[derive(Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct Store {
    next_id: i64,
    roles: BTreeMap<i64, Role>,
    users: BTreeMap<i64, UserRow>,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    options: BTreeMap<i64, ProductOption>,
    option_values: BTreeMap<i64, OptionValue>,
    menus: BTreeMap<i64, Menu>,
    menu_products: BTreeMap<i64, MenuProduct>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_role(&self, mut user: User) -> User {
        user.role = self.roles.get(&user.roles_id).cloned();
        user
    }

    fn with_category(&self, mut product: Product) -> Product {
        product.category = self.categories.get(&product.category_id).cloned();
        product
    }

    fn with_entries(&self, mut menu: Menu) -> Menu {
        menu.menu_products = self.entries_of(menu.id);
        menu
    }

    fn entries_of(&self, menu_id: i64) -> Vec<MenuProduct> {
        let mut entries: Vec<MenuProduct> = self
            .menu_products
            .values()
            .filter(|e| e.menu_id == menu_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.display_order, e.id));
        entries
    }
}

fn duplicate() -> AppError {
    AppError::conflict("Resource already exists")
}

fn dangling() -> AppError {
    AppError::conflict("Resource is still referenced")
}

/// MemoryRepository
///
/// An in-process implementation of `Repository` used by the test suites. It
/// applies the same uniqueness, restrict and cascade rules as the Postgres
/// schema so handler behavior can be exercised without a database.
pub struct MemoryRepository {
    store: Mutex<Store>,
}

impl MemoryRepository {
    /// Creates a store seeded with the `admin` and `customer` roles, like the migration.
    pub fn new() -> Self {
        let repo = Self::empty();
        {
            let mut store = repo.lock();
            for (name, description) in [("admin", "Full catalog access"), ("customer", "Default role")] {
                let id = store.next_id();
                let now = Utc::now();
                store.roles.insert(
                    id,
                    Role {
                        id,
                        role_name: name.to_string(),
                        description: description.to_string(),
                        permissions: String::new(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        repo
    }

    /// Creates a store with no rows at all.
    pub fn empty() -> Self {
        Self {
            store: Mutex::new(Store::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A panic in another test thread must not wedge the store.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- ROLES ---

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.lock().roles.values().cloned().collect())
    }

    async fn get_role(&self, id: i64) -> AppResult<Option<Role>> {
        Ok(self.lock().roles.get(&id).cloned())
    }

    async fn role_name_exists(&self, role_name: &str, exclude: Option<i64>) -> AppResult<bool> {
        Ok(self
            .lock()
            .roles
            .values()
            .any(|r| r.role_name == role_name && Some(r.id) != exclude))
    }

    async fn create_role(&self, req: CreateRoleRequest) -> AppResult<Role> {
        let mut store = self.lock();
        if store.roles.values().any(|r| r.role_name == req.role_name) {
            return Err(duplicate());
        }
        let id = store.next_id();
        let now = Utc::now();
        let role = Role {
            id,
            role_name: req.role_name,
            description: req.description,
            permissions: req.permissions,
            created_at: now,
            updated_at: now,
        };
        store.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: i64, req: UpdateRoleRequest) -> AppResult<Option<Role>> {
        let mut store = self.lock();
        if let Some(name) = &req.role_name {
            if store.roles.values().any(|r| &r.role_name == name && r.id != id) {
                return Err(duplicate());
            }
        }
        let Some(role) = store.roles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = req.role_name {
            role.role_name = v;
        }
        if let Some(v) = req.description {
            role.description = v;
        }
        if let Some(v) = req.permissions {
            role.permissions = v;
        }
        role.updated_at = Utc::now();
        Ok(Some(role.clone()))
    }

    async fn count_users_with_role(&self, role_id: i64) -> AppResult<i64> {
        Ok(self.lock().users.values().filter(|u| u.user.roles_id == role_id).count() as i64)
    }

    async fn delete_role(&self, id: i64) -> AppResult<bool> {
        let mut store = self.lock();
        if store.users.values().any(|u| u.user.roles_id == id) {
            return Err(dangling());
        }
        Ok(store.roles.remove(&id).is_some())
    }

    // --- USERS ---

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let store = self.lock();
        Ok(store
            .users
            .values()
            .map(|row| store.with_role(row.user.clone()))
            .collect())
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let store = self.lock();
        Ok(store.users.get(&id).map(|row| store.with_role(row.user.clone())))
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|row| row.user.email == email)
            .map(|row| UserCredentials {
                id: row.user.id,
                email: row.user.email.clone(),
                password_hash: row.password_hash.clone(),
                is_active: row.user.is_active,
            }))
    }

    async fn email_exists(&self, email: &str, exclude: Option<i64>) -> AppResult<bool> {
        Ok(self
            .lock()
            .users
            .values()
            .any(|row| row.user.email == email && Some(row.user.id) != exclude))
    }

    async fn create_user(&self, new: NewUser) -> AppResult<User> {
        let mut store = self.lock();
        if store.users.values().any(|row| row.user.email == new.email) {
            return Err(duplicate());
        }
        if !store.roles.contains_key(&new.roles_id) {
            return Err(dangling());
        }
        let id = store.next_id();
        let now = Utc::now();
        let user = User {
            id,
            username: new.username,
            email: new.email,
            roles_id: new.roles_id,
            is_active: true,
            created_at: now,
            updated_at: now,
            role: None,
        };
        store.users.insert(
            id,
            UserRow {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(store.with_role(user))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut store = self.lock();
        if let Some(email) = &changes.email {
            if store.users.values().any(|row| &row.user.email == email && row.user.id != id) {
                return Err(duplicate());
            }
        }
        if let Some(roles_id) = changes.roles_id {
            if !store.roles.contains_key(&roles_id) {
                return Err(dangling());
            }
        }
        let Some(row) = store.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.username {
            row.user.username = v;
        }
        if let Some(v) = changes.email {
            row.user.email = v;
        }
        if let Some(v) = changes.password_hash {
            row.password_hash = v;
        }
        if let Some(v) = changes.roles_id {
            row.user.roles_id = v;
        }
        if let Some(v) = changes.is_active {
            row.user.is_active = v;
        }
        row.user.updated_at = Utc::now();
        let user = row.user.clone();
        Ok(Some(store.with_role(user)))
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        Ok(self.lock().users.remove(&id).is_some())
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.lock().categories.values().cloned().collect();
        categories.sort_by_key(|c| (c.display_order, c.id));
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        Ok(self.lock().categories.get(&id).cloned())
    }

    async fn category_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool> {
        Ok(self
            .lock()
            .categories
            .values()
            .any(|c| c.name == name && Some(c.id) != exclude))
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> AppResult<Category> {
        let mut store = self.lock();
        if store.categories.values().any(|c| c.name == req.name) {
            return Err(duplicate());
        }
        let id = store.next_id();
        let now = Utc::now();
        let category = Category {
            id,
            name: req.name,
            description: req.description,
            display_order: req.display_order,
            image_url: req.image_url,
            created_at: now,
            updated_at: now,
        };
        store.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, req: UpdateCategoryRequest) -> AppResult<Option<Category>> {
        let mut store = self.lock();
        if let Some(name) = &req.name {
            if store.categories.values().any(|c| &c.name == name && c.id != id) {
                return Err(duplicate());
            }
        }
        let Some(category) = store.categories.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = req.name {
            category.name = v;
        }
        if let Some(v) = req.description {
            category.description = v;
        }
        if let Some(v) = req.display_order {
            category.display_order = v;
        }
        if let Some(v) = req.image_url {
            category.image_url = v;
        }
        category.updated_at = Utc::now();
        Ok(Some(category.clone()))
    }

    async fn count_products_in_category(&self, category_id: i64) -> AppResult<i64> {
        Ok(self
            .lock()
            .products
            .values()
            .filter(|p| p.category_id == category_id)
            .count() as i64)
    }

    async fn delete_category(&self, id: i64) -> AppResult<bool> {
        let mut store = self.lock();
        if store.products.values().any(|p| p.category_id == id) {
            return Err(dangling());
        }
        Ok(store.categories.remove(&id).is_some())
    }

    // --- PRODUCTS ---

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let store = self.lock();
        Ok(store
            .products
            .values()
            .map(|p| store.with_category(p.clone()))
            .collect())
    }

    async fn list_products_by_category(&self, category_id: i64) -> AppResult<Vec<Product>> {
        let store = self.lock();
        Ok(store
            .products
            .values()
            .filter(|p| p.category_id == category_id)
            .map(|p| store.with_category(p.clone()))
            .collect())
    }

    async fn get_product(&self, id: i64) -> AppResult<Option<Product>> {
        let store = self.lock();
        Ok(store.products.get(&id).map(|p| store.with_category(p.clone())))
    }

    async fn product_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool> {
        Ok(self
            .lock()
            .products
            .values()
            .any(|p| p.name == name && Some(p.id) != exclude))
    }

    async fn create_product(&self, req: CreateProductRequest) -> AppResult<Product> {
        let mut store = self.lock();
        if store.products.values().any(|p| p.name == req.name) {
            return Err(duplicate());
        }
        if !store.categories.contains_key(&req.category_id) {
            return Err(dangling());
        }
        let id = store.next_id();
        let now = Utc::now();
        let product = Product {
            id,
            category_id: req.category_id,
            category: None,
            name: req.name,
            description: req.description,
            price: req.price,
            stock_quantity: req.stock_quantity,
            is_available: req.is_available,
            preparation_time: req.preparation_time,
            created_at: now,
            updated_at: now,
        };
        store.products.insert(id, product.clone());
        Ok(store.with_category(product))
    }

    async fn update_product(&self, id: i64, req: UpdateProductRequest) -> AppResult<Option<Product>> {
        let mut store = self.lock();
        if let Some(name) = &req.name {
            if store.products.values().any(|p| &p.name == name && p.id != id) {
                return Err(duplicate());
            }
        }
        if let Some(category_id) = req.category_id {
            if !store.categories.contains_key(&category_id) {
                return Err(dangling());
            }
        }
        let Some(product) = store.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = req.category_id {
            product.category_id = v;
        }
        if let Some(v) = req.name {
            product.name = v;
        }
        if let Some(v) = req.description {
            product.description = v;
        }
        if let Some(v) = req.price {
            product.price = v;
        }
        if let Some(v) = req.stock_quantity {
            product.stock_quantity = v;
        }
        if let Some(v) = req.is_available {
            product.is_available = v;
        }
        if let Some(v) = req.preparation_time {
            product.preparation_time = v;
        }
        product.updated_at = Utc::now();
        let product = product.clone();
        Ok(Some(store.with_category(product)))
    }

    async fn set_product_availability(&self, id: i64, is_available: bool) -> AppResult<Option<Product>> {
        let req = UpdateProductRequest {
            is_available: Some(is_available),
            ..UpdateProductRequest::default()
        };
        self.update_product(id, req).await
    }

    async fn set_product_stock(&self, id: i64, stock_quantity: i32) -> AppResult<Option<Product>> {
        let req = UpdateProductRequest {
            stock_quantity: Some(stock_quantity),
            ..UpdateProductRequest::default()
        };
        self.update_product(id, req).await
    }

    async fn count_product_references(&self, product_id: i64) -> AppResult<i64> {
        let store = self.lock();
        let options = store.options.values().filter(|o| o.product_id == product_id).count();
        let entries = store
            .menu_products
            .values()
            .filter(|e| e.product_id == product_id)
            .count();
        Ok((options + entries) as i64)
    }

    async fn delete_product(&self, id: i64) -> AppResult<bool> {
        let mut store = self.lock();
        let referenced = store.options.values().any(|o| o.product_id == id)
            || store.menu_products.values().any(|e| e.product_id == id);
        if referenced {
            return Err(dangling());
        }
        Ok(store.products.remove(&id).is_some())
    }

    // --- PRODUCT OPTIONS ---

    async fn list_options(&self) -> AppResult<Vec<ProductOption>> {
        Ok(self.lock().options.values().cloned().collect())
    }

    async fn list_options_by_product(&self, product_id: i64) -> AppResult<Vec<ProductOption>> {
        Ok(self
            .lock()
            .options
            .values()
            .filter(|o| o.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn get_option(&self, id: i64) -> AppResult<Option<ProductOption>> {
        Ok(self.lock().options.get(&id).cloned())
    }

    async fn option_name_exists(&self, product_id: i64, name: &str, exclude: Option<i64>) -> AppResult<bool> {
        Ok(self
            .lock()
            .options
            .values()
            .any(|o| o.product_id == product_id && o.name == name && Some(o.id) != exclude))
    }

    async fn create_option(&self, req: CreateOptionRequest) -> AppResult<ProductOption> {
        let mut store = self.lock();
        if store
            .options
            .values()
            .any(|o| o.product_id == req.product_id && o.name == req.name)
        {
            return Err(duplicate());
        }
        if !store.products.contains_key(&req.product_id) {
            return Err(dangling());
        }
        let id = store.next_id();
        let option = ProductOption {
            id,
            product_id: req.product_id,
            name: req.name,
            selection_mode: req.selection_mode,
            is_required: req.is_required,
        };
        store.options.insert(id, option.clone());
        Ok(option)
    }

    async fn update_option(&self, id: i64, req: UpdateOptionRequest) -> AppResult<Option<ProductOption>> {
        let mut store = self.lock();
        let Some(current) = store.options.get(&id).cloned() else {
            return Ok(None);
        };
        let product_id = req.product_id.unwrap_or(current.product_id);
        let name = req.name.clone().unwrap_or(current.name.clone());
        if store
            .options
            .values()
            .any(|o| o.product_id == product_id && o.name == name && o.id != id)
        {
            return Err(duplicate());
        }
        if !store.products.contains_key(&product_id) {
            return Err(dangling());
        }
        let updated = ProductOption {
            id,
            product_id,
            name,
            selection_mode: req.selection_mode.unwrap_or(current.selection_mode),
            is_required: req.is_required.unwrap_or(current.is_required),
        };
        store.options.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn count_option_values(&self, option_id: i64) -> AppResult<i64> {
        Ok(self
            .lock()
            .option_values
            .values()
            .filter(|v| v.option_id == option_id)
            .count() as i64)
    }

    async fn delete_option(&self, id: i64) -> AppResult<bool> {
        let mut store = self.lock();
        if store.option_values.values().any(|v| v.option_id == id) {
            return Err(dangling());
        }
        Ok(store.options.remove(&id).is_some())
    }

    // --- OPTION VALUES ---

    async fn list_option_values(&self, option_id: i64) -> AppResult<Vec<OptionValue>> {
        Ok(self
            .lock()
            .option_values
            .values()
            .filter(|v| v.option_id == option_id)
            .cloned()
            .collect())
    }

    async fn get_option_value(&self, id: i64) -> AppResult<Option<OptionValue>> {
        Ok(self.lock().option_values.get(&id).cloned())
    }

    async fn option_value_exists(&self, option_id: i64, value: &str, exclude: Option<i64>) -> AppResult<bool> {
        Ok(self
            .lock()
            .option_values
            .values()
            .any(|v| v.option_id == option_id && v.value == value && Some(v.id) != exclude))
    }

    async fn create_option_values(
        &self,
        option_id: i64,
        values: Vec<CreateOptionValueRequest>,
    ) -> AppResult<Vec<OptionValue>> {
        let mut store = self.lock();
        if !store.options.contains_key(&option_id) {
            return Err(dangling());
        }

        // Validate the whole batch before touching the store.
        let mut seen: Vec<&str> = Vec::with_capacity(values.len());
        for req in &values {
            let taken = store
                .option_values
                .values()
                .any(|v| v.option_id == option_id && v.value == req.value);
            if taken || seen.contains(&req.value.as_str()) {
                return Err(duplicate());
            }
            seen.push(&req.value);
        }

        let mut created = Vec::with_capacity(values.len());
        for req in values {
            let id = store.next_id();
            let value = OptionValue {
                id,
                option_id,
                value: req.value,
                option_price: req.option_price,
            };
            store.option_values.insert(id, value.clone());
            created.push(value);
        }
        Ok(created)
    }

    async fn update_option_value(&self, id: i64, req: UpdateOptionValueRequest) -> AppResult<Option<OptionValue>> {
        let mut store = self.lock();
        let Some(current) = store.option_values.get(&id).cloned() else {
            return Ok(None);
        };
        let option_id = req.option_id.unwrap_or(current.option_id);
        let value = req.value.unwrap_or(current.value);
        if store
            .option_values
            .values()
            .any(|v| v.option_id == option_id && v.value == value && v.id != id)
        {
            return Err(duplicate());
        }
        if !store.options.contains_key(&option_id) {
            return Err(dangling());
        }
        let updated = OptionValue {
            id,
            option_id,
            value,
            option_price: req.option_price.unwrap_or(current.option_price),
        };
        store.option_values.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_option_value(&self, id: i64) -> AppResult<bool> {
        Ok(self.lock().option_values.remove(&id).is_some())
    }

    // --- MENUS ---

    async fn list_menus(&self) -> AppResult<Vec<Menu>> {
        let store = self.lock();
        Ok(store
            .menus
            .values()
            .map(|m| store.with_entries(m.clone()))
            .collect())
    }

    async fn get_menu(&self, id: i64) -> AppResult<Option<Menu>> {
        let store = self.lock();
        Ok(store.menus.get(&id).map(|m| store.with_entries(m.clone())))
    }

    async fn menu_name_exists(&self, name: &str, exclude: Option<i64>) -> AppResult<bool> {
        Ok(self
            .lock()
            .menus
            .values()
            .any(|m| m.name == name && Some(m.id) != exclude))
    }

    async fn create_menu(&self, req: CreateMenuRequest) -> AppResult<Menu> {
        let mut store = self.lock();
        if store.menus.values().any(|m| m.name == req.name) {
            return Err(duplicate());
        }
        let id = store.next_id();
        let now = Utc::now();
        let menu = Menu {
            id,
            name: req.name,
            description: req.description,
            price: req.price,
            is_available: req.is_available,
            created_at: now,
            updated_at: now,
            menu_products: Vec::new(),
        };
        store.menus.insert(id, menu.clone());
        Ok(menu)
    }

    async fn update_menu(&self, id: i64, req: UpdateMenuRequest) -> AppResult<Option<Menu>> {
        let mut store = self.lock();
        if let Some(name) = &req.name {
            if store.menus.values().any(|m| &m.name == name && m.id != id) {
                return Err(duplicate());
            }
        }
        let Some(menu) = store.menus.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = req.name {
            menu.name = v;
        }
        if let Some(v) = req.description {
            menu.description = v;
        }
        if let Some(v) = req.price {
            menu.price = v;
        }
        if let Some(v) = req.is_available {
            menu.is_available = v;
        }
        menu.updated_at = Utc::now();
        let menu = menu.clone();
        Ok(Some(store.with_entries(menu)))
    }

    async fn set_menu_availability(&self, id: i64, is_available: bool) -> AppResult<Option<Menu>> {
        let req = UpdateMenuRequest {
            is_available: Some(is_available),
            ..UpdateMenuRequest::default()
        };
        self.update_menu(id, req).await
    }

    async fn delete_menu(&self, id: i64) -> AppResult<bool> {
        let mut store = self.lock();
        if store.menus.remove(&id).is_none() {
            return Ok(false);
        }
        store.menu_products.retain(|_, e| e.menu_id != id);
        Ok(true)
    }

    // --- MENU ENTRIES ---

    async fn list_menu_products(&self, menu_id: i64) -> AppResult<Vec<MenuProduct>> {
        Ok(self.lock().entries_of(menu_id))
    }

    async fn get_menu_product(&self, id: i64) -> AppResult<Option<MenuProduct>> {
        Ok(self.lock().menu_products.get(&id).cloned())
    }

    async fn menu_product_exists(&self, menu_id: i64, product_id: i64) -> AppResult<bool> {
        Ok(self
            .lock()
            .menu_products
            .values()
            .any(|e| e.menu_id == menu_id && e.product_id == product_id))
    }

    async fn add_menu_product(&self, menu_id: i64, req: AddMenuProductRequest) -> AppResult<MenuProduct> {
        let mut store = self.lock();
        if store
            .menu_products
            .values()
            .any(|e| e.menu_id == menu_id && e.product_id == req.product_id)
        {
            return Err(duplicate());
        }
        if !store.menus.contains_key(&menu_id) || !store.products.contains_key(&req.product_id) {
            return Err(dangling());
        }
        let id = store.next_id();
        let entry = MenuProduct {
            id,
            menu_id,
            product_id: req.product_id,
            quantity: req.quantity,
            is_optional: req.is_optional,
            display_order: req.display_order,
        };
        store.menu_products.insert(id, entry.clone());
        Ok(entry)
    }

    async fn update_menu_product(
        &self,
        id: i64,
        req: UpdateMenuProductRequest,
    ) -> AppResult<Option<MenuProduct>> {
        let mut store = self.lock();
        let Some(entry) = store.menu_products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = req.quantity {
            entry.quantity = v;
        }
        if let Some(v) = req.is_optional {
            entry.is_optional = v;
        }
        if let Some(v) = req.display_order {
            entry.display_order = v;
        }
        Ok(Some(entry.clone()))
    }

    async fn delete_menu_product(&self, id: i64) -> AppResult<bool> {
        Ok(self.lock().menu_products.remove(&id).is_some())
    }
}

use catalog_api::{
    AppError,
    models::{
        AddMenuProductRequest, CreateCategoryRequest, CreateMenuRequest, CreateOptionRequest,
        CreateOptionValueRequest, CreateProductRequest, CreateRoleRequest, NewUser, SelectionMode,
        UpdateCategoryRequest, UpdateProductRequest, UserChanges,
    },
    repository::{MemoryRepository, PostgresRepository, Repository},
};
use chrono::Utc;
use sqlx::PgPool;
use tokio::test;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

/// Keeps names unique across runs against a shared database.
fn unique(prefix: &str) -> String {
    format!("{} {}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

// --- Shared Scenarios ---
// Each scenario runs against both stores so the in-memory double stays honest.

async fn category_product_lifecycle(repo: &impl Repository) {
    let category_name = unique("Drinks");
    let category = repo
        .create_category(CreateCategoryRequest {
            name: category_name.clone(),
            display_order: 3,
            ..CreateCategoryRequest::default()
        })
        .await
        .unwrap();
    assert!(repo.category_name_exists(&category_name, None).await.unwrap());
    assert!(!repo.category_name_exists(&category_name, Some(category.id)).await.unwrap());

    let updated = repo
        .update_category(
            category.id,
            UpdateCategoryRequest {
                description: Some("Cold".to_string()),
                ..UpdateCategoryRequest::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, category_name);
    assert_eq!(updated.description, "Cold");
    assert_eq!(updated.display_order, 3);

    let product = repo
        .create_product(CreateProductRequest {
            category_id: category.id,
            name: unique("Cola"),
            price: 2.5,
            stock_quantity: 5,
            is_available: true,
            ..CreateProductRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(product.category.as_ref().map(|c| c.id), Some(category.id));
    assert_eq!(repo.count_products_in_category(category.id).await.unwrap(), 1);

    let restocked = repo.set_product_stock(product.id, 12).await.unwrap().unwrap();
    assert_eq!(restocked.stock_quantity, 12);
    assert_eq!(restocked.price, 2.5);

    let repriced = repo
        .update_product(
            product.id,
            UpdateProductRequest {
                price: Some(3.0),
                ..UpdateProductRequest::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(repriced.price, 3.0);
    assert_eq!(repriced.stock_quantity, 12);

    // The store refuses to orphan the product.
    let err = repo.delete_category(category.id).await.unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);

    assert!(repo.delete_product(product.id).await.unwrap());
    assert!(repo.delete_category(category.id).await.unwrap());
    assert!(repo.get_category(category.id).await.unwrap().is_none());
    assert!(!repo.delete_category(category.id).await.unwrap());
}

async fn option_value_batch(repo: &impl Repository) {
    let category = repo
        .create_category(CreateCategoryRequest {
            name: unique("Burgers"),
            ..CreateCategoryRequest::default()
        })
        .await
        .unwrap();
    let product = repo
        .create_product(CreateProductRequest {
            category_id: category.id,
            name: unique("Classic"),
            price: 8.0,
            ..CreateProductRequest::default()
        })
        .await
        .unwrap();
    let option = repo
        .create_option(CreateOptionRequest {
            product_id: product.id,
            name: "Size".to_string(),
            selection_mode: SelectionMode::Single,
            is_required: true,
        })
        .await
        .unwrap();
    assert_eq!(option.selection_mode, SelectionMode::Single);
    assert!(repo.option_name_exists(product.id, "Size", None).await.unwrap());

    let values = repo
        .create_option_values(
            option.id,
            vec![
                CreateOptionValueRequest {
                    value: "Small".to_string(),
                    option_price: 0.0,
                },
                CreateOptionValueRequest {
                    value: "Large".to_string(),
                    option_price: 1.5,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(repo.count_option_values(option.id).await.unwrap(), 2);
    assert!(repo.option_value_exists(option.id, "Large", None).await.unwrap());

    // A batch colliding with a stored value leaves nothing behind.
    let err = repo
        .create_option_values(
            option.id,
            vec![
                CreateOptionValueRequest {
                    value: "Medium".to_string(),
                    option_price: 0.5,
                },
                CreateOptionValueRequest {
                    value: "Large".to_string(),
                    option_price: 1.5,
                },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(repo.list_option_values(option.id).await.unwrap().len(), 2);

    for value in values {
        assert!(repo.delete_option_value(value.id).await.unwrap());
    }
    assert!(repo.delete_option(option.id).await.unwrap());
    assert!(repo.delete_product(product.id).await.unwrap());
    assert!(repo.delete_category(category.id).await.unwrap());
}

async fn menu_cascade(repo: &impl Repository) {
    let category = repo
        .create_category(CreateCategoryRequest {
            name: unique("Sides"),
            ..CreateCategoryRequest::default()
        })
        .await
        .unwrap();
    let fries = repo
        .create_product(CreateProductRequest {
            category_id: category.id,
            name: unique("Fries"),
            price: 2.0,
            ..CreateProductRequest::default()
        })
        .await
        .unwrap();
    let menu = repo
        .create_menu(CreateMenuRequest {
            name: unique("Lunch"),
            price: 9.5,
            is_available: true,
            ..CreateMenuRequest::default()
        })
        .await
        .unwrap();

    let entry = repo
        .add_menu_product(
            menu.id,
            AddMenuProductRequest {
                product_id: fries.id,
                quantity: 2,
                ..AddMenuProductRequest::default()
            },
        )
        .await
        .unwrap();
    assert!(repo.menu_product_exists(menu.id, fries.id).await.unwrap());
    assert_eq!(repo.count_product_references(fries.id).await.unwrap(), 1);

    let loaded = repo.get_menu(menu.id).await.unwrap().unwrap();
    assert_eq!(loaded.menu_products.len(), 1);
    assert_eq!(loaded.menu_products[0].quantity, 2);

    let hidden = repo.set_menu_availability(menu.id, false).await.unwrap().unwrap();
    assert!(!hidden.is_available);
    assert_eq!(hidden.price, 9.5);

    assert!(repo.delete_menu(menu.id).await.unwrap());
    assert!(repo.get_menu_product(entry.id).await.unwrap().is_none());
    assert!(repo.get_product(fries.id).await.unwrap().is_some());
    assert_eq!(repo.count_product_references(fries.id).await.unwrap(), 0);

    assert!(repo.delete_product(fries.id).await.unwrap());
    assert!(repo.delete_category(category.id).await.unwrap());
}

async fn user_with_role(repo: &impl Repository) {
    let email = format!("{}@example.com", unique("user").replace(' ', "."));
    let user = repo
        .create_user(NewUser {
            username: "tester".to_string(),
            email: email.clone(),
            password_hash: "$2b$04$placeholder".to_string(),
            roles_id: 2,
        })
        .await
        .unwrap();
    assert!(user.is_active);
    assert_eq!(user.role.as_ref().map(|r| r.role_name.as_str()), Some("customer"));

    let credentials = repo.find_credentials(&email).await.unwrap().unwrap();
    assert_eq!(credentials.id, user.id);
    assert_eq!(credentials.password_hash, "$2b$04$placeholder");

    let deactivated = repo
        .update_user(
            user.id,
            UserChanges {
                is_active: Some(false),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!deactivated.is_active);
    assert_eq!(deactivated.email, email);

    assert!(repo.count_users_with_role(2).await.unwrap() >= 1);
    assert!(repo.delete_user(user.id).await.unwrap());
    assert!(repo.get_user(user.id).await.unwrap().is_none());
}

// --- In-memory store ---

#[test]
async fn test_memory_category_product_lifecycle() {
    category_product_lifecycle(&MemoryRepository::new()).await;
}

#[test]
async fn test_memory_option_value_batch() {
    option_value_batch(&MemoryRepository::new()).await;
}

#[test]
async fn test_memory_menu_cascade() {
    menu_cascade(&MemoryRepository::new()).await;
}

#[test]
async fn test_memory_user_with_role() {
    user_with_role(&MemoryRepository::new()).await;
}

#[test]
async fn test_memory_empty_has_no_roles() {
    let repo = MemoryRepository::empty();

    assert!(repo.list_roles().await.unwrap().is_empty());
}

// --- Postgres store (needs DATABASE_URL) ---

#[test]
#[ignore]
async fn test_postgres_category_product_lifecycle() {
    let ctx = DbTestContext::setup().await;
    category_product_lifecycle(&ctx.repository()).await;
}

#[test]
#[ignore]
async fn test_postgres_option_value_batch() {
    let ctx = DbTestContext::setup().await;
    option_value_batch(&ctx.repository()).await;
}

#[test]
#[ignore]
async fn test_postgres_menu_cascade() {
    let ctx = DbTestContext::setup().await;
    menu_cascade(&ctx.repository()).await;
}

#[test]
#[ignore]
async fn test_postgres_user_with_role() {
    let ctx = DbTestContext::setup().await;
    user_with_role(&ctx.repository()).await;
}

#[test]
#[ignore]
async fn test_postgres_seeded_roles() {
    let ctx = DbTestContext::setup().await;
    let roles = ctx.repository().list_roles().await.unwrap();

    let names: Vec<&str> = roles.iter().map(|r| r.role_name.as_str()).collect();
    assert!(names.contains(&"admin"));
    assert!(names.contains(&"customer"));
}

#[test]
#[ignore]
async fn test_postgres_overlong_value_is_validation_error() {
    let ctx = DbTestContext::setup().await;

    // role_name is VARCHAR(50); the store rejects it with 22001.
    let result = ctx
        .repository()
        .create_role(CreateRoleRequest {
            role_name: "r".repeat(51),
            ..CreateRoleRequest::default()
        })
        .await;

    assert_eq!(result.err().unwrap(), AppError::validation("Invalid data"));
}

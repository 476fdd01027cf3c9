use catalog_api::{
    AppConfig, AppState, MemoryRepository, create_router,
    error::ErrorBody,
    models::{Category, LoginResponse, Menu, OptionValue, Product, ProductOption, User},
    repository::RepositoryState,
};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default()).await
}

async fn spawn_app_with(config: AppConfig) -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let router = create_router(AppState::new(repo, config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a customer and logs in, returning the bearer token.
    async fn login_as(&self, email: &str) -> String {
        let registered = self
            .client
            .post(self.url("/users"))
            .json(&json!({
                "username": "tester",
                "email": email,
                "password": "Sup3r.Secret",
                "roles_id": 2
            }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(registered.status(), StatusCode::CREATED);

        let login = self
            .client
            .post(self.url("/users/login"))
            .json(&json!({ "email": email, "password": "Sup3r.Secret" }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(login.status(), StatusCode::OK);

        login.json::<LoginResponse>().await.unwrap().token
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc: serde_json::Value = response.json().await.unwrap();
    assert!(doc["paths"]["/menus/{id}/products"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_register_login_and_browse() {
    let app = spawn_app().await;
    let token = app.login_as("alice@example.com").await;

    let me = app
        .client
        .get(app.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    let users: Vec<User> = me.json().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "alice@example.com");

    let categories = app
        .client
        .get(app.url("/categories"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(categories.status(), StatusCode::OK);
    assert!(categories.json::<Vec<Category>>().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_failure_message() {
    let app = spawn_app().await;
    app.login_as("alice@example.com").await;

    let response = app
        .client
        .post(app.url("/users/login"))
        .json(&json!({ "email": "alice@example.com", "password": "Wrong.Pass1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.error, "Email or Password Invalid");
}

#[tokio::test]
async fn test_build_a_menu_end_to_end() {
    let app = spawn_app().await;
    let token = app.login_as("chef@example.com").await;

    let category: Category = app
        .client
        .post(app.url("/categories"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Burgers", "display_order": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let created = app
        .client
        .post(app.url("/products"))
        .bearer_auth(&token)
        .json(&json!({
            "category_id": category.id,
            "name": "Classic",
            "price": 8.5,
            "stock_quantity": 20
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let product: Product = created.json().await.unwrap();
    assert_eq!(product.category.map(|c| c.name), Some("Burgers".to_string()));

    let option: ProductOption = app
        .client
        .post(app.url("/options"))
        .bearer_auth(&token)
        .json(&json!({
            "product_id": product.id,
            "name": "Cheese",
            "selection_mode": "multiple"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let values = app
        .client
        .post(app.url(&format!("/options/{}/values", option.id)))
        .bearer_auth(&token)
        .json(&json!([
            { "value": "Cheddar", "option_price": 0.5 },
            { "value": "Swiss", "option_price": 0.7 }
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(values.status(), StatusCode::CREATED);
    assert_eq!(values.json::<Vec<OptionValue>>().await.unwrap().len(), 2);

    let not_an_array = app
        .client
        .post(app.url(&format!("/options/{}/values", option.id)))
        .bearer_auth(&token)
        .json(&json!({ "value": "Brie" }))
        .send()
        .await
        .unwrap();
    assert_eq!(not_an_array.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        not_an_array.json::<ErrorBody>().await.unwrap().error,
        "Invalid data, expected an array of values"
    );

    let menu: Menu = app
        .client
        .post(app.url("/menus"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Lunch", "price": 11.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let added = app
        .client
        .post(app.url(&format!("/menus/{}/products", menu.id)))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(added.status(), StatusCode::CREATED);

    let toggled: Menu = app
        .client
        .patch(app.url(&format!("/menus/{}/availability", menu.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!toggled.is_available);
    assert_eq!(toggled.menu_products.len(), 1);
    assert_eq!(toggled.menu_products[0].quantity, 1);

    let stock = app
        .client
        .patch(app.url(&format!("/products/{}/stock", product.id)))
        .bearer_auth(&token)
        .json(&json!({ "stock_quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(stock.json::<Product>().await.unwrap().stock_quantity, 3);

    let by_category: Vec<Product> = app
        .client
        .get(app.url(&format!("/products/category/{}", category.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_category.len(), 1);

    let deleted = app
        .client
        .delete(app.url(&format!("/menus/{}", menu.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);

    let gone = app
        .client
        .get(app.url(&format!("/menus/{}", menu.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_is_global() {
    let app = spawn_app_with(AppConfig {
        rate_limit_rps: 1,
        ..AppConfig::default()
    })
    .await;

    let first = app.client.get(app.url("/health")).send().await.unwrap();
    let second = app.client.get(app.url("/health")).send().await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let app = spawn_app().await;

    let response = app
        .client
        .request(reqwest::Method::OPTIONS, app.url("/categories"))
        .header("Origin", "http://localhost:8000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "authorization,content-type")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:8000")
    );
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-credentials")
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

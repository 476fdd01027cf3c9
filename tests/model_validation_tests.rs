use catalog_api::models::{
    AddMenuProductRequest, CreateMenuRequest, CreateOptionRequest, CreateProductRequest, Role,
    SelectionMode, UpdateCategoryRequest, UpdateProductRequest, User,
};
use serde_json::json;

#[test]
fn test_user_serialization_has_no_password_and_carries_role() {
    let user = User {
        id: 5,
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        roles_id: 2,
        is_active: true,
        role: Some(Role {
            id: 2,
            role_name: "customer".to_string(),
            ..Role::default()
        }),
        ..User::default()
    };

    let value = serde_json::to_value(&user).unwrap();

    assert!(value.get("password").is_none());
    assert!(value.get("password_hash").is_none());
    assert_eq!(value["role"]["role_name"], "customer");
    assert_eq!(value["roles_id"], 2);
}

#[test]
fn test_selection_mode_is_lowercase() {
    assert_eq!(serde_json::to_value(SelectionMode::Single).unwrap(), json!("single"));
    assert_eq!(serde_json::to_value(SelectionMode::Multiple).unwrap(), json!("multiple"));

    let parsed: CreateOptionRequest = serde_json::from_value(json!({
        "product_id": 1,
        "name": "Toppings",
        "selection_mode": "multiple"
    }))
    .unwrap();
    assert_eq!(parsed.selection_mode, SelectionMode::Multiple);
    assert!(!parsed.is_required);
}

#[test]
fn test_unknown_selection_mode_is_rejected() {
    let parsed = serde_json::from_value::<CreateOptionRequest>(json!({
        "product_id": 1,
        "name": "Toppings",
        "selection_mode": "several"
    }));
    assert!(parsed.is_err());

    assert!(SelectionMode::try_from("Single".to_string()).is_err());
    assert_eq!(SelectionMode::try_from("single".to_string()).unwrap(), SelectionMode::Single);
    assert_eq!(SelectionMode::Multiple.as_str(), "multiple");
}

#[test]
fn test_create_defaults() {
    let product: CreateProductRequest = serde_json::from_value(json!({
        "category_id": 1,
        "name": "Cola",
        "price": 2.5
    }))
    .unwrap();
    assert!(product.is_available);
    assert_eq!(product.stock_quantity, 0);
    assert_eq!(product.description, "");

    let menu: CreateMenuRequest = serde_json::from_value(json!({ "name": "Lunch", "price": 9.9 })).unwrap();
    assert!(menu.is_available);

    let entry: AddMenuProductRequest = serde_json::from_value(json!({ "product_id": 3 })).unwrap();
    assert_eq!(entry.quantity, 1);
    assert!(!entry.is_optional);
    assert_eq!(entry.display_order, 0);
}

#[test]
fn test_missing_required_fields_fail() {
    assert!(serde_json::from_value::<CreateProductRequest>(json!({ "name": "Cola" })).is_err());
    assert!(serde_json::from_value::<CreateMenuRequest>(json!({ "price": 1.0 })).is_err());
}

#[test]
fn test_update_requests_skip_absent_fields() {
    let update = UpdateProductRequest {
        price: Some(3.0),
        ..UpdateProductRequest::default()
    };
    assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "price": 3.0 }));

    let parsed: UpdateCategoryRequest = serde_json::from_value(json!({ "display_order": 4 })).unwrap();
    assert_eq!(parsed.display_order, Some(4));
    assert!(parsed.name.is_none());
}

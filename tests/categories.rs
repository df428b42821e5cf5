//! Category routes behind bearer authentication.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use chrono::Duration;
use serde_json::{json, Value};

use spendwise::auth::TokenKeys;
use spendwise::config::JwtSecret;
use spendwise::db::MemoryStore;
use spendwise::AppState;

const SECRET: &str = "categories-secret";

fn keys() -> TokenKeys {
    TokenKeys::new(&JwtSecret::new(SECRET), Duration::minutes(100))
}

fn bearer(username: &str) -> (&'static str, String) {
    let token = keys().issue(username).unwrap();
    ("Authorization", format!("Bearer {token}"))
}

async fn state() -> AppState {
    let store = MemoryStore::default();
    for name in ["alice", "bob"] {
        store
            .add_user(name, &format!("{name}@example.com"), "password", 4)
            .await
            .unwrap();
    }
    AppState::new(Arc::new(store), keys())
}

fn create(username: &str, body: Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/categories")
        .insert_header(bearer(username))
        .set_json(body)
}

#[actix_web::test]
async fn test_category_lifecycle() {
    let state = state().await;
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = create(
        "alice",
        json!({"title": "Groceries", "type": "expense", "description": "Weekly food"}),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["type"], "expense");

    let req = test::TestRequest::get()
        .uri(&format!("/categories/{id}"))
        .insert_header(bearer("alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/categories/{id}"))
        .insert_header(bearer("alice"))
        .set_json(json!({"title": "Food", "description": "Everything edible"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["title"], "Food");
    assert_eq!(updated["type"], "expense");

    let req = test::TestRequest::delete()
        .uri(&format!("/categories/{id}"))
        .insert_header(bearer("alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/categories/{id}"))
        .insert_header(bearer("alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_list_filters_by_query() {
    let state = state().await;
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    for (title, kind) in [
        ("Groceries", "expense"),
        ("Salary", "income"),
        ("Rent", "expense"),
    ] {
        let req = create("alice", json!({"title": title, "type": kind})).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/categories?type=expense")
        .insert_header(bearer("alice"))
        .to_request();
    let found: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found.len(), 2);

    let req = test::TestRequest::get()
        .uri("/categories?type=expense&title=groc")
        .insert_header(bearer("alice"))
        .to_request();
    let found: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], "Groceries");
}

#[actix_web::test]
async fn test_categories_are_private_to_their_owner() {
    let state = state().await;
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = create("alice", json!({"title": "Savings", "type": "income"})).to_request();
    let resp = test::call_service(&app, req).await;
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/categories/{id}"))
        .insert_header(bearer("bob"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = test::TestRequest::get()
        .uri("/categories")
        .insert_header(bearer("bob"))
        .to_request();
    let found: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(found.is_empty());
}

#[actix_web::test]
async fn test_invalid_category_requests() {
    let state = state().await;
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = create("alice", json!({"title": "", "type": "expense"})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = create("alice", json!({"title": "No type"})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/categories/not-a-number")
        .insert_header(bearer("alice"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::put()
        .uri("/categories/999")
        .insert_header(bearer("alice"))
        .set_json(json!({"title": "Missing"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_category_routes_require_valid_token() {
    let state = state().await;
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::get().uri("/categories").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let forged = TokenKeys::new(&JwtSecret::new("not-the-secret"), Duration::minutes(100))
        .issue("alice")
        .unwrap();
    let req = test::TestRequest::get()
        .uri("/categories")
        .insert_header(("Authorization", format!("Bearer {forged}")))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    // Valid signature, but the user no longer exists.
    let req = test::TestRequest::get()
        .uri("/categories")
        .insert_header(bearer("ghost"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

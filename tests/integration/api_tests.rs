//! API integration tests
//!
//! These run against a live server with a fresh database:
//! `cargo run` in one terminal, then `cargo test -- --ignored`.

use reqwest::Client;
use serde_json::{json, Value};

use bookhive_server::models::user::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";

// Must match auth.jwt_secret in config/default.toml
const JWT_SECRET: &str = "change-this-secret-in-production";

/// Mint a bearer token directly; the server validates tokens but does
/// not issue them.
fn token_for(user_id: i32, name: &str, role: Role) -> String {
    UserClaims::new(user_id, name, role, 1)
        .create_token(JWT_SECRET)
        .expect("Failed to create token")
}

fn admin_token() -> String {
    token_for(1, "admin", Role::Admin)
}

fn user_token(user_id: i32) -> String {
    token_for(user_id, "reader", Role::User)
}

async fn create_book(client: &Client, token: &str, isbn: &str, copies: i32) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "Test Book",
            "author": "Test Author",
            "isbn": isbn,
            "copies": copies
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse book response")
}

async fn create_request(client: &Client, token: &str, book_id: i64) -> Value {
    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send create request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse request response")
}

async fn get_book(client: &Client, token: &str, book_id: i64) -> Value {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send get book request");

    assert_eq!(response.status(), 200);
    response.json().await.expect("Failed to parse book response")
}

async fn decide(client: &Client, token: &str, request_id: i64, body: Value) -> reqwest::Response {
    client
        .post(format!("{}/borrows/{}/decision", BASE_URL, request_id))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send decision request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_requires_authentication() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_admin_endpoints_refuse_plain_users() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrows", BASE_URL))
        .bearer_auth(user_token(2))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_create_book_validates_isbn() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(admin_token())
        .json(&json!({
            "title": "Bad Book",
            "author": "Someone",
            "isbn": "not-an-isbn",
            "copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "VALIDATION");
}

#[tokio::test]
#[ignore]
async fn test_approvals_reserve_copies_until_stock_runs_out() {
    let client = Client::new();
    let admin = admin_token();
    let user = user_token(2);

    let book = create_book(&client, &admin, "978-0-306-40615-7", 2).await;
    let book_id = book["id"].as_i64().expect("book id");
    assert_eq!(book["available_copies"], 2);

    let r1 = create_request(&client, &user, book_id).await;
    let r2 = create_request(&client, &user, book_id).await;
    let r3 = create_request(&client, &user, book_id).await;
    assert_eq!(r1["status"], "PENDING");

    let approve = json!({ "decision": "approve" });

    let response = decide(&client, &admin, r1["id"].as_i64().expect("id"), approve.clone()).await;
    assert_eq!(response.status(), 200);
    assert_eq!(get_book(&client, &admin, book_id).await["available_copies"], 1);

    let response = decide(&client, &admin, r2["id"].as_i64().expect("id"), approve.clone()).await;
    assert_eq!(response.status(), 200);
    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["available_copies"], 0);
    assert_eq!(book["stock_status"], "OUT_OF_STOCK");

    // Third approval must fail: no copies left. The request stays pending.
    let r3_id = r3["id"].as_i64().expect("id");
    let response = decide(&client, &admin, r3_id, approve.clone()).await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "OUT_OF_STOCK");

    // Returning one copy frees it for the blocked request.
    let response = client
        .post(format!("{}/borrows/{}/return", BASE_URL, r1["id"].as_i64().expect("id")))
        .bearer_auth(&user)
        .send()
        .await
        .expect("Failed to send return request");
    assert_eq!(response.status(), 200);
    assert_eq!(get_book(&client, &admin, book_id).await["available_copies"], 1);

    let response = decide(&client, &admin, r3_id, approve).await;
    assert_eq!(response.status(), 200);
    assert_eq!(get_book(&client, &admin, book_id).await["available_copies"], 0);
}

#[tokio::test]
#[ignore]
async fn test_full_lifecycle_restores_stock() {
    let client = Client::new();
    let admin = admin_token();
    let user = user_token(2);

    let book = create_book(&client, &admin, "978-1-4028-9462-6", 1).await;
    let book_id = book["id"].as_i64().expect("book id");

    let request = create_request(&client, &user, book_id).await;
    let request_id = request["id"].as_i64().expect("id");

    let response = decide(&client, &admin, request_id, json!({ "decision": "approve" })).await;
    assert_eq!(response.status(), 200);
    let decided: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(decided["status"], "APPROVED");

    let response = client
        .post(format!("{}/borrows/{}/return", BASE_URL, request_id))
        .bearer_auth(&user)
        .send()
        .await
        .expect("Failed to send return request");
    assert_eq!(response.status(), 200);
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["status"], "RETURNED");

    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["available_copies"], 1);
    assert_eq!(book["stock_status"], "IN_STOCK");
}

#[tokio::test]
#[ignore]
async fn test_second_decision_is_refused() {
    let client = Client::new();
    let admin = admin_token();
    let user = user_token(2);

    let book = create_book(&client, &admin, "978-0-13-468599-1", 1).await;
    let request = create_request(&client, &user, book["id"].as_i64().expect("book id")).await;
    let request_id = request["id"].as_i64().expect("id");

    let response = decide(&client, &admin, request_id, json!({ "decision": "approve" })).await;
    assert_eq!(response.status(), 200);

    let response = decide(
        &client,
        &admin,
        request_id,
        json!({ "decision": "reject", "reason": "too late" }),
    )
    .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "INVALID_STATE");
}

#[tokio::test]
#[ignore]
async fn test_rejection_requires_a_reason() {
    let client = Client::new();
    let admin = admin_token();
    let user = user_token(2);

    let book = create_book(&client, &admin, "978-0-262-03384-8", 1).await;
    let request = create_request(&client, &user, book["id"].as_i64().expect("book id")).await;
    let request_id = request["id"].as_i64().expect("id");

    let response = decide(
        &client,
        &admin,
        request_id,
        json!({ "decision": "reject", "reason": "   " }),
    )
    .await;
    assert_eq!(response.status(), 400);

    let response = decide(
        &client,
        &admin,
        request_id,
        json!({ "decision": "reject", "reason": "copy is damaged" }),
    )
    .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "REJECTED");
    assert_eq!(body["rejection_reason"], "copy is damaged");

    // Rejection reserves nothing.
    let book = get_book(&client, &admin, book["id"].as_i64().expect("book id")).await;
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_return_refused_for_pending_request() {
    let client = Client::new();
    let admin = admin_token();
    let user = user_token(2);

    let book = create_book(&client, &admin, "978-0-596-51774-8", 1).await;
    let request = create_request(&client, &user, book["id"].as_i64().expect("book id")).await;

    let response = client
        .post(format!("{}/borrows/{}/return", BASE_URL, request["id"].as_i64().expect("id")))
        .bearer_auth(&user)
        .send()
        .await
        .expect("Failed to send return request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_purchase_consumes_and_cancel_restores_stock() {
    let client = Client::new();
    let admin = admin_token();
    let user = user_token(2);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Priced Book",
            "author": "Test Author",
            "isbn": "978-3-16-148410-0",
            "copies": 3,
            "price": 12.5
        }))
        .send()
        .await
        .expect("Failed to send create book request");
    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.expect("Failed to parse response");
    let book_id = book["id"].as_i64().expect("book id");

    let response = client
        .post(format!("{}/purchases", BASE_URL))
        .bearer_auth(&user)
        .json(&json!({ "book_id": book_id, "quantity": 2 }))
        .send()
        .await
        .expect("Failed to send purchase request");
    assert_eq!(response.status(), 201);
    let purchase: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(purchase["status"], "PENDING");
    let total: f64 = purchase["total"]
        .as_str()
        .expect("total is a decimal string")
        .parse()
        .expect("total parses");
    assert_eq!(total, 25.0);

    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["copies"], 1);
    assert_eq!(book["available_copies"], 1);

    let response = client
        .post(format!(
            "{}/purchases/{}/cancel",
            BASE_URL,
            purchase["id"].as_i64().expect("id")
        ))
        .bearer_auth(&user)
        .send()
        .await
        .expect("Failed to send cancel request");
    assert_eq!(response.status(), 200);

    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["copies"], 3);
    assert_eq!(book["available_copies"], 3);
}

#[tokio::test]
#[ignore]
async fn test_decision_notifies_the_borrower() {
    let client = Client::new();
    let admin = admin_token();
    let user = user_token(2);

    let book = create_book(&client, &admin, "978-0-7356-6745-7", 1).await;
    let request = create_request(&client, &user, book["id"].as_i64().expect("book id")).await;

    let response = decide(
        &client,
        &admin,
        request["id"].as_i64().expect("id"),
        json!({ "decision": "approve" }),
    )
    .await;
    assert_eq!(response.status(), 200);

    // Notification delivery is asynchronous.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let response = client
        .get(format!("{}/notifications", BASE_URL))
        .bearer_auth(&user)
        .send()
        .await
        .expect("Failed to send notifications request");
    assert_eq!(response.status(), 200);

    let notifications: Value = response.json().await.expect("Failed to parse response");
    let found = notifications
        .as_array()
        .expect("array")
        .iter()
        .any(|n| n["kind"] == "borrow.approved");
    assert!(found, "expected a borrow.approved notification");
}

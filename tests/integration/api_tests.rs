//! API integration tests
//!
//! Run against a live server started with `ADMIN_PASSWORD` set:
//! `cargo test -- --ignored`

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn admin_password() -> String {
    std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "change-this-admin-password".to_string())
}

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

fn unique_isbn() -> String {
    format!("{:013}", uuid::Uuid::new_v4().as_u128() % 10u128.pow(13))
}

async fn login(client: &Client, login: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": login, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn admin_token(client: &Client) -> String {
    login(client, "admin", &admin_password()).await
}

async fn post(client: &Client, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    (status, response.json().await.unwrap_or(Value::Null))
}

/// Register a member who can log in, returning (id, token)
async fn new_member(client: &Client, admin: &str) -> (i64, String) {
    let login_name = unique("reader");
    let (status, body) = post(
        client,
        admin,
        "/members",
        json!({
            "login": login_name,
            "password": "reader-password",
            "firstname": "Test",
            "lastname": "Reader",
            "role": "student"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().expect("member id");
    (id, login(client, &login_name, "reader-password").await)
}

async fn new_book(client: &Client, admin: &str, copies: i64) -> Value {
    let (status, body) = post(
        client,
        admin,
        "/books",
        json!({
            "title": unique("Integration "),
            "isbn": unique_isbn(),
            "available_copies": copies
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
#[ignore]
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
async fn test_readiness_check() {
    let response = Client::new()
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let response = Client::new()
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_get_current_member() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["login"], "admin");
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_catalog_requires_authentication() {
    let response = Client::new()
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/books?per_page=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_conflicts() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book = new_book(&client, &admin, 1).await;

    let (status, body) = post(
        &client,
        &admin,
        "/books",
        json!({ "title": "Copy", "isbn": book["isbn"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_and_reserve_flow() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book = new_book(&client, &admin, 1).await;
    let book_id = book["id"].as_i64().unwrap();
    let (first_id, first) = new_member(&client, &admin).await;
    let (_, second) = new_member(&client, &admin).await;

    // Borrow the only copy
    let (status, outcome) = post(
        &client,
        &first,
        "/loans",
        json!({ "book_id": book_id, "member_id": first_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["book"]["available_copies"], 0);
    assert_eq!(outcome["book"]["status"], "borrowed");
    let loan_id = outcome["loan"]["id"].as_i64().unwrap();

    // Nothing left for anyone else; the second member queues instead
    let (status, body) = post(&client, &second, "/scan", json!({ "barcode": book["barcode"], "action": "borrow" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);

    let (status, reservation) = post(&client, &second, "/reservations", json!({ "book_id": book_id })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reservation["status"], "active");

    // Return promotes the reservation
    let (status, returned) = post(&client, &first, &format!("/loans/{}/return", loan_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let fine: f64 = returned["fine"].as_str().unwrap().parse().unwrap();
    assert_eq!(fine, 0.0);
    assert_eq!(returned["promoted"]["id"], reservation["id"]);

    // A second return is refused
    let (status, body) = post(&client, &first, &format!("/loans/{}/return", loan_id), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "AlreadyReturned");
}

#[tokio::test]
#[ignore]
async fn test_borrow_cap() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, token) = new_member(&client, &admin).await;

    for _ in 0..3 {
        let book = new_book(&client, &admin, 1).await;
        let (status, _) = post(
            &client,
            &token,
            "/loans",
            json!({ "book_id": book["id"], "member_id": member_id }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let book = new_book(&client, &admin, 1).await;
    let (status, body) = post(
        &client,
        &token,
        "/loans",
        json!({ "book_id": book["id"], "member_id": member_id }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "MaxBorrowsReached");
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_read_stats() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, token) = new_member(&client, &admin).await;

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["books_total"].is_number());
    assert!(body["popular_books"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_bulk_inventory() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book = new_book(&client, &admin, 2).await;

    let (status, body) = post(
        &client,
        &admin,
        "/scan/bulk",
        json!({ "action": "inventory", "items": [book["barcode"], "NO-SUCH-CODE"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total"], 2);
    assert_eq!(body["stats"]["success"], 1);
    assert_eq!(body["stats"]["errors"], 1);
}

#[tokio::test]
#[ignore]
async fn test_register_creates_student_and_logs_in() {
    let client = Client::new();
    let login_name = unique("self");

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "login": login_name,
            "password": "self-service-pw",
            "firstname": "Grace",
            "lastname": "Hopper",
            "email": format!("{}@example.org", login_name)
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["role"], "student");
    let token = body["token"].as_str().expect("No token in response");

    let me: Value = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(me["login"], login_name.as_str());
    let card = me["card_number"].as_str().expect("card number");
    assert_eq!(card, format!("M{:04}", body["member_id"].as_i64().unwrap()));

    // Same login again
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "login": login_name,
            "password": "self-service-pw",
            "firstname": "Grace",
            "lastname": "Hopper",
            "email": "other@example.org"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_book_edit_keeps_lent_copy_counters() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book = new_book(&client, &admin, 1).await;
    let book_id = book["id"].as_i64().unwrap();
    let (member_id, token) = new_member(&client, &admin).await;

    let (status, _) = post(
        &client,
        &token,
        "/loans",
        json!({ "book_id": book_id, "member_id": member_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .json(&json!({ "title": unique("Renamed ") }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available_copies"], 0);
    assert_eq!(body["status"], "borrowed");
}

#[tokio::test]
#[ignore]
async fn test_loan_listing_reports_default_page_size() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let body: Value = client
        .get(format!("{}/loans?page=2", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["page"], 2);
    assert_eq!(body["per_page"], 20);
}

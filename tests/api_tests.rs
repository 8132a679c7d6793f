//! API integration tests against a running server
//!
//! Start the server with `LIBRARY__AUTH__BOOTSTRAP_USERNAME=admin` and
//! `LIBRARY__AUTH__BOOTSTRAP_PASSWORD=admin`, then run `cargo test -- --ignored`.

use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api";

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse login response");
    body["access"].as_str().expect("No access token").to_string()
}

async fn call(
    client: &Client,
    method: Method,
    token: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = client
        .request(method, format!("{}{}", BASE_URL, path))
        .bearer_auth(token);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.expect("Failed to send request");
    let status = response.status();
    (status, response.json().await.unwrap_or(Value::Null))
}

async fn post(client: &Client, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    call(client, Method::POST, token, path, Some(body)).await
}

async fn put(client: &Client, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    call(client, Method::PUT, token, path, Some(body)).await
}

async fn get(client: &Client, token: &str, path: &str) -> (StatusCode, Value) {
    call(client, Method::GET, token, path, None).await
}

async fn delete(client: &Client, token: &str, path: &str) -> StatusCode {
    call(client, Method::DELETE, token, path, None).await.0
}

/// Direction, publisher and author ids for new books
async fn create_catalog(client: &Client, admin: &str, n: u128) -> (Value, Value, Value) {
    let (status, direction) = post(client, admin, "/directions", json!({ "name": format!("Prose {}", n) })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, publisher) = post(client, admin, "/publishers", json!({ "name": format!("Kyrgyzstan {}", n) })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, author) = post(
        client,
        admin,
        "/authors",
        json!({ "first_name": "Chingiz", "last_name": "Aitmatov" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (direction["id"].clone(), publisher["id"].clone(), author["id"].clone())
}

async fn create_book(
    client: &Client,
    admin: &str,
    catalog: &(Value, Value, Value),
    title: &str,
    quantity: i32,
) -> Value {
    let (status, book) = post(
        client,
        admin,
        "/books",
        json!({
            "title": title,
            "author_ids": [catalog.2],
            "direction_id": catalog.0,
            "publisher_id": catalog.1,
            "quantity": quantity,
            "category": "fiction"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    book
}

/// Register a reader with unique identity fields; returns (id, access token)
async fn register_reader(client: &Client, n: u128) -> (i64, String) {
    let response = client
        .post(format!("{}/register", BASE_URL))
        .json(&json!({
            "username": format!("reader{}", n),
            "password": "reader-pass",
            "first_name": "Aibek",
            "last_name": "Osmonov",
            "birth_date": "2000-05-01",
            "passport": format!("AN{:06}", n % 1_000_000),
            "phone": format!("+996{:09}", n % 1_000_000_000),
            "address": "Bishkek, Chui 1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered: Value = response.json().await.unwrap();
    assert_eq!(registered["user"]["role"], "reader");
    (
        registered["user"]["id"].as_i64().unwrap(),
        registered["access"].as_str().unwrap().to_string(),
    )
}

async fn copy_count(client: &Client, admin: &str, book_id: i64) -> i64 {
    let (status, copies) = get(client, admin, &format!("/inventories?book_id={}", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    copies["total"].as_i64().unwrap()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_refresh_flow() {
    let client = Client::new();

    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({ "username": "admin", "password": "admin" }))
        .send()
        .await
        .unwrap();
    let tokens: Value = response.json().await.unwrap();

    let response = client
        .post(format!("{}/token/refresh", BASE_URL))
        .json(&json!({ "refresh": tokens["refresh"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["access"].is_string());

    // An access token is not accepted for refreshing
    let response = client
        .post(format!("{}/token/refresh", BASE_URL))
        .json(&json!({ "refresh": tokens["access"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_reader_is_refused_librarian_endpoints() {
    let client = Client::new();
    let (reader_id, reader) = register_reader(&client, unique_suffix()).await;

    for report in ["issued", "overdue", "availability", "readers"] {
        let (status, _) = get(&client, &reader, &format!("/reports/{}", report)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "report {}", report);
    }

    let (status, _) = get(&client, &reader, "/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(
        &client,
        &reader,
        "/authors",
        json!({ "first_name": "Chingiz", "last_name": "Aitmatov" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(&client, &reader, "/issues", json!({ "reader_id": reader_id, "book_id": 1 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Catalog reads are open to readers
    let (status, _) = get(&client, &reader, "/books").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_account_changes_apply_to_issued_tokens() {
    let client = Client::new();
    let admin = login(&client, "admin", "admin").await;
    let n = unique_suffix();

    let username = format!("librarian{}", n);
    let (status, librarian) = post(
        &client,
        &admin,
        "/users",
        json!({ "username": username, "password": "lib-pass", "role": "librarian" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let librarian_id = librarian["id"].as_i64().unwrap();
    let token = login(&client, &username, "lib-pass").await;

    let (status, _) = get(&client, &token, "/users").await;
    assert_eq!(status, StatusCode::OK);

    // Demoted: the token still carries the librarian role, the account does not
    let (status, _) = put(&client, &admin, &format!("/users/{}", librarian_id), json!({ "role": "reader" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&client, &token, "/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Deactivated: the token is no longer accepted at all
    assert_eq!(
        delete(&client, &admin, &format!("/users/{}", librarian_id)).await,
        StatusCode::NO_CONTENT
    );
    let (status, body) = get(&client, &token, "/books").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
#[ignore]
async fn test_lending_scenario() {
    let client = Client::new();
    let admin = login(&client, "admin", "admin").await;
    let n = unique_suffix();

    let catalog = create_catalog(&client, &admin, n).await;
    let book = create_book(&client, &admin, &catalog, &format!("Jamilia {}", n), 2).await;
    assert_eq!(book["authors"][0]["last_name"], "Aitmatov");
    let book_id = book["id"].as_i64().unwrap();

    // Two available copies numbered from their ids
    let (_, copies) = get(&client, &admin, &format!("/inventories?book_id={}&ordering=inventory_number", book_id)).await;
    assert_eq!(copies["total"], 2);
    for copy in copies["items"].as_array().unwrap() {
        assert_eq!(copy["status"], "available");
        let number = copy["inventory_number"].as_str().unwrap();
        assert_eq!(number, format!("INV-{:05}", copy["id"].as_i64().unwrap()));
    }

    let (reader_id, reader_token) = register_reader(&client, n).await;

    // Issue one copy with the default due date
    let (status, issue) = post(&client, &admin, "/issues", json!({ "reader_id": reader_id, "book_id": book_id })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issue["status"], "issued");
    assert_eq!(issue["inventory"]["status"], "borrowed");

    // Same book again is refused
    let (status, error) = post(&client, &admin, "/issues", json!({ "reader_id": reader_id, "book_id": book_id })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "AlreadyHoldsBook");

    // The reader sees only their own issue
    let (_, own) = get(&client, &reader_token, "/issues").await;
    assert_eq!(own["total"], 1);

    // Only one copy is left on the shelf, so the quantity cannot drop to zero
    let (status, _) = put(&client, &admin, &format!("/books/{}", book_id), json!({ "quantity": 0 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Return on time: no fine, the copy is available again
    let (status, returned) = post(&client, &admin, "/returns", json!({ "issue_id": issue["id"], "condition": "good" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let fine: f64 = returned["fine"].as_str().unwrap().parse().unwrap();
    assert_eq!(fine, 0.0);
    assert_eq!(returned["issue"]["status"], "returned");

    let (status, error) = post(&client, &admin, "/returns", json!({ "issue_id": issue["id"] })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "AlreadyReturned");

    // Both copies available again; dropping quantity to one now succeeds
    let (status, _) = put(&client, &admin, &format!("/books/{}", book_id), json!({ "quantity": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(copy_count(&client, &admin, book_id).await, 1);

    // Book with issue history cannot be deleted
    assert_eq!(
        delete(&client, &admin, &format!("/books/{}", book_id)).await,
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
#[ignore]
async fn test_loan_limit_and_copy_reconciliation() {
    let client = Client::new();
    let admin = login(&client, "admin", "admin").await;
    let n = unique_suffix();

    let catalog = create_catalog(&client, &admin, n).await;
    let first = create_book(&client, &admin, &catalog, &format!("The White Ship {}", n), 3).await;
    let second = create_book(&client, &admin, &catalog, &format!("Farewell, Gulsary {}", n), 1).await;
    let third = create_book(&client, &admin, &catalog, &format!("The Day Lasts {}", n), 1).await;
    let fourth = create_book(&client, &admin, &catalog, &format!("The Scaffold {}", n), 1).await;
    let first_id = first["id"].as_i64().unwrap();
    let fourth_id = fourth["id"].as_i64().unwrap();

    let (reader_id, _) = register_reader(&client, n).await;
    let (other_reader_id, _) = register_reader(&client, n + 1).await;

    // Three open loans is the limit
    for book in [&first, &second, &third] {
        let (status, _) = post(&client, &admin, "/issues", json!({ "reader_id": reader_id, "book_id": book["id"] })).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, error) = post(&client, &admin, "/issues", json!({ "reader_id": reader_id, "book_id": fourth_id })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "MaxIssuesReached");

    // Growing appends copies: non-deleted copies always match the quantity
    let (status, book) = put(&client, &admin, &format!("/books/{}", first_id), json!({ "quantity": 6 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["quantity"], 6);
    assert_eq!(copy_count(&client, &admin, first_id).await, 6);

    // Shrinking retires available copies only; the borrowed one stays
    let (status, _) = put(&client, &admin, &format!("/books/{}", first_id), json!({ "quantity": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(copy_count(&client, &admin, first_id).await, 2);
    let (_, borrowed) = get(&client, &admin, &format!("/inventories?book_id={}&status=borrowed", first_id)).await;
    assert_eq!(borrowed["total"], 1);

    // The copy left on the shelf can still be issued to someone else
    let (status, issue) = post(&client, &admin, "/issues", json!({ "reader_id": other_reader_id, "book_id": first_id })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issue["inventory"]["book_id"], first_id);

    // Nothing available any more: no shrink, no issue
    let (status, error) = put(&client, &admin, &format!("/books/{}", first_id), json!({ "quantity": 1 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "InsufficientAvailableCopies");
    assert_eq!(copy_count(&client, &admin, first_id).await, 2);

    // Removing a single copy lowers the quantity
    let (_, copies) = get(&client, &admin, &format!("/inventories?book_id={}", fourth_id)).await;
    let copy_id = copies["items"][0]["id"].as_i64().unwrap();
    assert_eq!(
        delete(&client, &admin, &format!("/inventories/{}", copy_id)).await,
        StatusCode::NO_CONTENT
    );
    let (_, book) = get(&client, &admin, &format!("/books/{}", fourth_id)).await;
    assert_eq!(book["quantity"], 0);
    assert_eq!(copy_count(&client, &admin, fourth_id).await, 0);

    // Adding one back raises it again
    let (status, copy) = post(&client, &admin, "/inventories", json!({ "book_id": fourth_id })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(copy["status"], "available");
    let (_, book) = get(&client, &admin, &format!("/books/{}", fourth_id)).await;
    assert_eq!(book["quantity"], 1);
}

#[tokio::test]
#[ignore]
async fn test_quantity_above_limit_is_rejected() {
    let client = Client::new();
    let admin = login(&client, "admin", "admin").await;
    let n = unique_suffix();

    let catalog = create_catalog(&client, &admin, n).await;
    let (status, body) = post(
        &client,
        &admin,
        "/books",
        json!({
            "title": format!("Too many {}", n),
            "author_ids": [catalog.2],
            "direction_id": catalog.0,
            "publisher_id": catalog.1,
            "quantity": 2_000_000_000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("quantity"));
}

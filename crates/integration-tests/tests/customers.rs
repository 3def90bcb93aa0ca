//! Signup, login and profile management over HTTP.

use reqwest::StatusCode;
use serde_json::{Value, json};

use mecar_integration_tests::{TestContext, unique};

async fn customer_rows(ctx: &TestContext, username: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM mecar.customer WHERE username = $1")
        .bind(username)
        .fetch_one(&ctx.pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (MECAR_TEST_DATABASE_URL)"]
async fn test_duplicate_username_is_rejected() {
    let ctx = TestContext::new().await;
    let username = unique("dupe");
    ctx.signup(&username).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/customer/signup"))
        .json(&json!({
            "name": "Someone Else",
            "phone": "555-0101",
            "username": username,
            "password": "another fine password",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "username_taken");
    assert_eq!(customer_rows(&ctx, &username).await, 1);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (MECAR_TEST_DATABASE_URL)"]
async fn test_login_issues_working_token() {
    let ctx = TestContext::new().await;
    let username = unique("login");
    ctx.signup(&username).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/customer/login"))
        .json(&json!({ "username": username, "password": "wrong password here" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");

    let resp = ctx
        .client
        .post(ctx.url("/api/customer/login"))
        .json(&json!({ "username": username, "password": "correct horse battery" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let resp = TestContext::bearer(ctx.client.get(ctx.url("/api/user/me")), token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["username"], username.as_str());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (MECAR_TEST_DATABASE_URL)"]
async fn test_phone_only_update_leaves_other_fields() {
    let ctx = TestContext::new().await;
    let username = unique("phone");
    let token = ctx.signup(&username).await;

    let resp = TestContext::bearer(ctx.client.put(ctx.url("/api/user/me")), &token)
        .json(&json!({ "phone": "555-0999" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();

    assert!(body["new_token"].is_null());
    let user = &body["user"];
    assert_eq!(user["phone"], "555-0999");
    assert_eq!(user["name"], "Test Customer");
    assert_eq!(user["address"], "1 Test Street");
    assert_eq!(user["username"], username.as_str());

    // The token from signup still resolves
    let resp = TestContext::bearer(ctx.client.get(ctx.url("/api/user/me")), &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (MECAR_TEST_DATABASE_URL)"]
async fn test_username_change_issues_new_token() {
    let ctx = TestContext::new().await;
    let old_name = unique("before");
    let new_name = unique("after");
    let token = ctx.signup(&old_name).await;

    let resp = TestContext::bearer(ctx.client.put(ctx.url("/api/user/me")), &token)
        .json(&json!({ "username": new_name }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["username"], new_name.as_str());
    let new_token = body["new_token"].as_str().unwrap().to_owned();

    // The old token names a username that no longer exists
    let resp = TestContext::bearer(ctx.client.get(ctx.url("/api/user/me")), &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "customer_not_found");

    let resp = TestContext::bearer(ctx.client.get(ctx.url("/api/user/me")), &new_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (MECAR_TEST_DATABASE_URL)"]
async fn test_update_rejections() {
    let ctx = TestContext::new().await;
    let taken = unique("taken");
    ctx.register_direct(&taken).await;
    let token = ctx.register_direct(&unique("mover")).await;
    let url = ctx.url("/api/user/me");

    let resp = TestContext::bearer(ctx.client.put(&url), &token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "no_fields_provided");

    let resp = TestContext::bearer(ctx.client.put(&url), &token)
        .json(&json!({ "username": taken }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "username_taken");
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (MECAR_TEST_DATABASE_URL)"]
async fn test_delete_keeps_purchase_rows() {
    let ctx = TestContext::new().await;
    let username = unique("leaver");
    let token = ctx.register_direct(&username).await;
    let car_id = ctx.insert_car(&unique("Kept"), "Record", 2016, 8_000).await;

    let resp = TestContext::bearer(
        ctx.client.post(ctx.url(&format!("/api/car/{car_id}/purchase"))),
        &token,
    )
    .send()
    .await
    .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = TestContext::bearer(ctx.client.delete(ctx.url("/api/user/me")), &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(customer_rows(&ctx, &username).await, 0);

    assert_eq!(ctx.purchase_count(car_id).await, 1);
    assert!(!ctx.is_available(car_id).await);

    let resp = TestContext::bearer(ctx.client.get(ctx.url("/api/user/me")), &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (MECAR_TEST_DATABASE_URL)"]
async fn test_token_does_not_survive_reregistration() {
    let ctx = TestContext::new().await;
    let username = unique("reborn");
    let old_token = ctx.register_direct(&username).await;
    let car_id = ctx.insert_car(&unique("Reborn"), "Second", 2020, 9_500).await;

    let resp = TestContext::bearer(ctx.client.delete(ctx.url("/api/user/me")), &old_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Same username, new account
    let new_token = ctx.register_direct(&username).await;

    let resp = TestContext::bearer(ctx.client.get(ctx.url("/api/user/me")), &old_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "customer_not_found");

    let resp = TestContext::bearer(
        ctx.client.post(ctx.url(&format!("/api/car/{car_id}/purchase"))),
        &old_token,
    )
    .send()
    .await
    .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(ctx.is_available(car_id).await);

    let resp = TestContext::bearer(ctx.client.get(ctx.url("/api/user/me")), &new_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["username"], username.as_str());
}

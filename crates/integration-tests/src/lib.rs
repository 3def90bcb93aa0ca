//! Integration tests for `MeCar`.
//!
//! # Running Tests
//!
//! ```bash
//! export MECAR_TEST_DATABASE_URL=postgres://localhost/mecar_test
//! cargo test -p mecar-integration-tests -- --ignored
//! ```
//!
//! Each test gets its own server on an ephemeral port, sharing one database.
//! Tests isolate their data with unique usernames and car makes, so they can
//! run in parallel against the same schema.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use mecar_api::config::{DatabaseConfig, TokenConfig};
use mecar_api::db;
use mecar_api::services::auth::{AuthService, Registration, Session};
use mecar_api::state::AppState;
use mecar_core::CarId;

/// Test signing key. Never used outside tests.
const TEST_TOKEN_SECRET: &str = "it-k3Yf9!vQ2#pLm8@xR4$wZ7^tB1&nH6*c";

/// Database URL for integration tests.
///
/// # Panics
///
/// Panics if `MECAR_TEST_DATABASE_URL` is not set.
#[must_use]
pub fn database_url() -> String {
    std::env::var("MECAR_TEST_DATABASE_URL")
        .expect("MECAR_TEST_DATABASE_URL must be set for integration tests")
}

/// Token settings shared by every test server.
#[must_use]
pub fn token_config() -> TokenConfig {
    TokenConfig {
        secret: SecretString::from(TEST_TOKEN_SECRET.to_owned()),
        ttl: Duration::from_secs(3600),
    }
}

fn database_config(statement_timeout: Duration) -> DatabaseConfig {
    DatabaseConfig {
        url: SecretString::from(database_url()),
        max_connections: 20,
        acquire_timeout: Duration::from_secs(5),
        statement_timeout,
    }
}

/// A separate pool whose connections cancel any statement running longer
/// than `statement_timeout`.
///
/// # Panics
///
/// Panics if the database is unreachable.
pub async fn pool_with_statement_timeout(statement_timeout: Duration) -> PgPool {
    db::create_pool(&database_config(statement_timeout))
        .await
        .expect("Failed to connect to test database")
}

/// A short random suffix for usernames and makes.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &id[..10])
}

/// A running API server plus direct database access.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
    pub state: AppState,
}

impl TestContext {
    /// Connect, migrate and start a server on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the database is unreachable or the server cannot bind.
    pub async fn new() -> Self {
        let pool = pool_with_statement_timeout(Duration::from_secs(5)).await;

        sqlx::migrate!("../api/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let state =
            AppState::new(pool.clone(), &token_config()).expect("Failed to build app state");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let app = mecar_api::app(state.clone());
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
            pool,
            state,
        }
    }

    /// Full URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Attach a bearer token to a request.
    #[must_use]
    pub fn bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {token}"))
    }

    /// Register a customer over HTTP and return the token.
    ///
    /// # Panics
    ///
    /// Panics if signup does not return 201 with a token.
    pub async fn signup(&self, username: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/customer/signup"))
            .json(&json!({
                "name": "Test Customer",
                "phone": "555-0100",
                "address": "1 Test Street",
                "username": username,
                "password": "correct horse battery",
            }))
            .send()
            .await
            .expect("Signup request failed");

        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let body: Value = resp.json().await.expect("Signup body is not JSON");
        body["token"]
            .as_str()
            .expect("Signup response has no token")
            .to_owned()
    }

    /// Register a customer through the service layer, bypassing the HTTP
    /// rate limiter, and return the token.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn register_direct(&self, username: &str) -> String {
        self.register_session(username).await.token
    }

    /// Like [`TestContext::register_direct`], but returns the whole session.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn register_session(&self, username: &str) -> Session {
        AuthService::new(&self.pool, self.state.tokens(), self.state.hasher())
            .register(Registration {
                name: "Direct Customer".to_owned(),
                phone: "555-0199".to_owned(),
                address: None,
                username: username.to_owned(),
                password: "correct horse battery".to_owned(),
            })
            .await
            .expect("Direct registration failed")
    }

    /// Insert an available car and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn insert_car(&self, make: &str, model: &str, year: i32, price: i64) -> CarId {
        sqlx::query_scalar::<_, CarId>(
            r"
            INSERT INTO mecar.car (name, make, model, year, price, mileage, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, NULL)
            RETURNING id
            ",
        )
        .bind(format!("{make} {model}"))
        .bind(make)
        .bind(model)
        .bind(year)
        .bind(Decimal::new(price, 0))
        .bind(10_000_i32)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert car")
    }

    /// Number of purchase rows for a car.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn purchase_count(&self, car_id: CarId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM mecar.purchase WHERE car_id = $1")
            .bind(car_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count purchases")
    }

    /// The car's availability flag.
    ///
    /// # Panics
    ///
    /// Panics if the car does not exist.
    pub async fn is_available(&self, car_id: CarId) -> bool {
        sqlx::query_scalar("SELECT is_available FROM mecar.car WHERE id = $1")
            .bind(car_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read car")
    }
}

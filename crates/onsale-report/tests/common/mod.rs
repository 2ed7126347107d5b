#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] builds the REAL router and state over its own PostgreSQL
//! schema (selected through `search_path`), so tests can run in parallel
//! against one database without seeing each other's rows.
//!
//! Tests need `DATABASE_URL`; when it is unset [`TestApp::try_new`] returns
//! `None` and the test returns early.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tower::ServiceExt;
use uuid::Uuid;

use onsale_report::auth::{AuthorizedContext, JwtVerifier};
use onsale_report::config::Config;
use onsale_report::routes;
use onsale_report::state::AppState;
use onsale_report_test_utils::{SCHEMA_SQL, TestAnalysis, insert_all, test_claims};

pub const JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";
pub const BASE: &str = "/reports/emails/onsale-analysis";

/// Test application wrapper using the REAL routes and state.
pub struct TestApp {
    router: Router,
    pub db: PgPool,
    pub state: AppState,
    pub config: Config,
    schema: String,
    admin: PgPool,
}

impl TestApp {
    /// Create an app over a fresh, empty schema, or `None` without a database.
    pub async fn try_new() -> Option<Self> {
        dotenvy::dotenv().ok();
        let database_url = std::env::var("DATABASE_URL").ok()?;

        let schema = format!("report_test_{}", Uuid::now_v7().simple());

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::query(&format!("CREATE SCHEMA \"{schema}\""))
            .execute(&admin)
            .await
            .expect("Failed to create test schema");

        let options = PgConnectOptions::from_str(&database_url)
            .expect("Invalid DATABASE_URL")
            .options([("search_path", schema.as_str())]);
        let db = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .expect("Failed to connect with test schema");

        sqlx::query(SCHEMA_SQL)
            .execute(&db)
            .await
            .expect("Failed to create analysis table");

        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some(database_url.clone()),
            "AUTH_JWT_SECRET" => Some(JWT_SECRET.to_string()),
            _ => None,
        })
        .expect("Failed to build test config");

        let verifier = Arc::new(JwtVerifier::from_config(&config));
        let state = AppState::from_parts(&config, db.clone(), verifier);
        let router = routes::app(state.clone(), &config);

        Some(Self {
            router,
            db,
            state,
            config,
            schema,
            admin,
        })
    }

    /// Insert fixtures into this app's schema.
    pub async fn seed(&self, fixtures: &[TestAnalysis]) {
        insert_all(&self.db, fixtures)
            .await
            .expect("Failed to insert fixtures");
    }

    /// Drop this app's schema.
    pub async fn cleanup(self) {
        self.db.close().await;
        sqlx::query(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", self.schema))
            .execute(&self.admin)
            .await
            .ok();
    }

    /// A context as the authorization middleware would produce it.
    pub fn context(&self) -> AuthorizedContext {
        AuthorizedContext {
            subject: "analyst-1".to_string(),
            email: Some("analyst-1@example.com".to_string()),
            roles: vec!["user".to_string()],
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// GET `BASE{path}` as a caller holding the `user` role.
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let token = user_token(&["public", "user"]);
        self.request(
            Request::get(format!("{BASE}{path}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

/// Signed bearer token for a caller with `roles`.
pub fn user_token(roles: &[&str]) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &test_claims("analyst-1", roles),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Ids of the items in a page body, in order.
pub fn item_ids(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .expect("items should be an array")
        .iter()
        .map(|item| item["id"].as_str().expect("id should be a string").to_string())
        .collect()
}

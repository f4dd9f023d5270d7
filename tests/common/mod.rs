#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};

use foodgram::{init_db, insert_ingredients_in_db, make_router, serve_on, AppConfig};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing_subscriber::EnvFilter;

// 1x1 transparent png
pub const PIXEL: &str = include_str!("../fixtures/pixel.datauri");

static APP_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub pool: SqlitePool,
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub async fn spawn_app() -> TestApp {
    init_test_tracing();
    let pool = init_db("sqlite::memory:")
        .await
        .expect("in-memory database should open");
    let listener = TcpListener::bind("127.0.0.1:0").expect("should bind a free port");
    let local_addr = listener.local_addr().expect("listener has an address");
    let media_root = std::env::temp_dir().join(format!(
        "foodgram-test-{}-{}",
        std::process::id(),
        APP_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let config = AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        media_root,
        bind_address: local_addr,
    };
    tokio::spawn(serve_on(listener, make_router(), pool.clone(), config));
    TestApp {
        address: format!("http://{local_addr}"),
        client: Client::new(),
        pool,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    fn authorize(builder: RequestBuilder, user: Option<&TestUser>) -> RequestBuilder {
        match user {
            Some(user) => builder.header("Authorization", format!("Token {}", user.token)),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, user: Option<&TestUser>) -> Response {
        Self::authorize(self.client.get(self.url(path)), user)
            .send()
            .await
            .expect("request should be sent")
    }

    pub async fn post(&self, path: &str, user: Option<&TestUser>, body: Value) -> Response {
        Self::authorize(self.client.post(self.url(path)), user)
            .json(&body)
            .send()
            .await
            .expect("request should be sent")
    }

    pub async fn put(&self, path: &str, user: Option<&TestUser>, body: Value) -> Response {
        Self::authorize(self.client.put(self.url(path)), user)
            .json(&body)
            .send()
            .await
            .expect("request should be sent")
    }

    pub async fn patch(&self, path: &str, user: Option<&TestUser>, body: Value) -> Response {
        Self::authorize(self.client.patch(self.url(path)), user)
            .json(&body)
            .send()
            .await
            .expect("request should be sent")
    }

    pub async fn delete(&self, path: &str, user: Option<&TestUser>) -> Response {
        Self::authorize(self.client.delete(self.url(path)), user)
            .send()
            .await
            .expect("request should be sent")
    }

    /// Registers `username` and logs in.
    pub async fn register(&self, username: &str) -> TestUser {
        let email = format!("{username}@example.com");
        let response = self
            .post(
                "/api/users/",
                None,
                json!({
                    "email": email,
                    "username": username,
                    "first_name": "Test",
                    "last_name": "Cook",
                    "password": "correct-horse-battery",
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "registration of {username} failed");
        let body: Value = response.json().await.expect("json body");
        let id = body["id"].as_i64().expect("user id");

        let response = self
            .post(
                "/api/auth/token/login/",
                None,
                json!({ "email": email, "password": "correct-horse-battery" }),
            )
            .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("json body");
        let token = body["auth_token"].as_str().expect("token").to_string();
        TestUser { id, token }
    }

    /// Seeds ingredients and returns their ids in the given order.
    pub async fn seed_ingredients(&self, items: &[(&str, &str)]) -> Vec<i64> {
        let rows: Vec<(String, String)> = items
            .iter()
            .map(|(name, unit)| (name.to_string(), unit.to_string()))
            .collect();
        insert_ingredients_in_db(&self.pool, &rows)
            .await
            .expect("ingredients should insert");
        let mut ids = Vec::with_capacity(items.len());
        for (name, unit) in items {
            let id = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM ingredients WHERE name = $1 AND measurement_unit = $2",
            )
            .bind(*name)
            .bind(*unit)
            .fetch_one(&self.pool)
            .await
            .expect("seeded ingredient");
            ids.push(id);
        }
        ids
    }

    /// Creates a recipe and returns its id.
    pub async fn create_recipe(&self, author: &TestUser, name: &str, ingredients: Value) -> i64 {
        let response = self
            .post(
                "/api/recipes/",
                Some(author),
                json!({
                    "ingredients": ingredients,
                    "image": PIXEL,
                    "name": name,
                    "text": "Mix everything.",
                    "cooking_time": 15,
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "recipe {name} was not created");
        let body: Value = response.json().await.expect("json body");
        body["id"].as_i64().expect("recipe id")
    }

    pub async fn join_row_count(&self, recipe_id: i64) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_one(&self.pool)
            .await
            .expect("count query")
    }
}

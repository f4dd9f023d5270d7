mod authentication;
mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod extract;
mod handlers;
mod images;
mod models;
mod shopping_list;
mod site;
#[cfg(test)]
mod test_utils;

use std::{net::TcpListener, sync::Arc, time::Instant};

use anyhow::Context;
pub use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::*,
    Extension, Json, Router,
};
pub use config::AppConfig;
pub use data_formats::*;
pub use db_helpers::insert_ingredients_in_db;
pub use errors::RequestError;
use handlers::*;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};

pub type JsonResponse<T> = (StatusCode, Json<T>);

/// Serves `app` with the database and configuration attached on the configured address.
pub async fn run_app(app: Router, pool: SqlitePool, config: AppConfig) -> Result<()> {
    let address = config.bind_address;
    let app = with_state(app, pool, config);
    tracing::info!(%address, "server started");
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// Like [`run_app`] but on an already bound listener, which lets callers pick a free port.
pub async fn serve_on(
    listener: TcpListener,
    app: Router,
    pool: SqlitePool,
    config: AppConfig,
) -> Result<()> {
    let app = with_state(app, pool, config);
    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

fn with_state(app: Router, pool: SqlitePool, config: AppConfig) -> Router {
    app.layer(Extension(Arc::new(pool)))
        .layer(Extension(Arc::new(config)))
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    let pool = if db_url.contains(":memory:") {
        // Every connection to :memory: opens a separate database, so keep exactly one alive.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(db_url)
            .await
            .context("Failed to open in-memory database")?
    } else {
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            tracing::info!(db_url, "creating database");
            Sqlite::create_database(db_url)
                .await
                .context("Failed to create database")?;
        }
        SqlitePool::connect(db_url)
            .await
            .context("Failed to connect to database")?
    };
    tracing::info!("running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("migrations completed");
    Ok(pool)
}

async fn log_request(request: Request<Body>, next: Next<Body>) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    response
}

pub fn make_router() -> Router {
    let api = Router::new()
        .route("/auth/token/login/", post(login_user))
        .route("/auth/token/logout/", post(logout_user))
        .route("/users/", get(list_users).post(register_user))
        .route("/users/me/", get(get_current_user))
        .route("/users/me/avatar/", put(update_avatar).delete(delete_avatar))
        .route("/users/set_password/", post(set_password))
        .route("/users/subscriptions/", get(list_subscriptions))
        .route("/users/:id/", get(get_user))
        .route("/users/:id/subscribe/", post(subscribe).delete(unsubscribe))
        .route("/ingredients/", get(list_ingredients))
        .route("/ingredients/:id/", get(get_ingredient))
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/download_shopping_cart/",
            get(download_shopping_cart),
        )
        .route(
            "/recipes/:id/",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/recipes/:id/favorite/",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart/",
            post(add_to_shopping_cart).delete(remove_from_shopping_cart),
        )
        .route("/recipes/:id/get-link/", get(get_short_link));

    Router::new()
        .route("/check_health", get(alive))
        .nest("/api", api)
        .route("/media/*path", get(serve_media))
        .route("/s/:code", get(follow_short_link))
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
}

mod common;

use common::{spawn_app, PIXEL};
use serde_json::{json, Value};

#[tokio::test]
async fn favorite_add_twice_conflicts() {
    let app = spawn_app().await;
    let ids = app.seed_ingredients(&[("Salt", "g")]).await;
    let author = app.register("author").await;
    let fan = app.register("fan").await;
    let recipe_id = app
        .create_recipe(&author, "Salt", json!([{"id": ids[0], "amount": 5}]))
        .await;
    let path = format!("/api/recipes/{recipe_id}/favorite/");

    let response = app.post(&path, Some(&fan), json!({})).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], recipe_id);
    assert_eq!(body["name"], "Salt");
    assert_eq!(body["cooking_time"], 15);
    assert!(body["image"].as_str().unwrap().starts_with("http://"));

    let response = app.post(&path, Some(&fan), json!({})).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn favorite_add_remove_remove() {
    let app = spawn_app().await;
    let ids = app.seed_ingredients(&[("Salt", "g")]).await;
    let author = app.register("author").await;
    let recipe_id = app
        .create_recipe(&author, "Salt", json!([{"id": ids[0], "amount": 5}]))
        .await;
    let path = format!("/api/recipes/{recipe_id}/favorite/");

    assert_eq!(app.post(&path, Some(&author), json!({})).await.status(), 201);
    assert_eq!(app.delete(&path, Some(&author)).await.status(), 204);
    assert_eq!(app.delete(&path, Some(&author)).await.status(), 400);
}

#[tokio::test]
async fn toggles_on_missing_recipe_are_not_found() {
    let app = spawn_app().await;
    let user = app.register("user").await;
    for action in ["favorite", "shopping_cart"] {
        let path = format!("/api/recipes/4242/{action}/");
        assert_eq!(app.post(&path, Some(&user), json!({})).await.status(), 404);
        assert_eq!(app.delete(&path, Some(&user)).await.status(), 404);
        assert_eq!(app.post(&path, None, json!({})).await.status(), 401);
    }
}

#[tokio::test]
async fn flags_reflect_viewer() {
    let app = spawn_app().await;
    let ids = app.seed_ingredients(&[("Salt", "g")]).await;
    let author = app.register("author").await;
    let fan = app.register("fan").await;
    let recipe_id = app
        .create_recipe(&author, "Salt", json!([{"id": ids[0], "amount": 5}]))
        .await;
    app.post(&format!("/api/recipes/{recipe_id}/favorite/"), Some(&fan), json!({}))
        .await;
    app.post(
        &format!("/api/recipes/{recipe_id}/shopping_cart/"),
        Some(&fan),
        json!({}),
    )
    .await;
    app.post(&format!("/api/users/{}/subscribe/", author.id), Some(&fan), json!({}))
        .await;
    let path = format!("/api/recipes/{recipe_id}/");

    let body: Value = app.get(&path, Some(&fan)).await.json().await.unwrap();
    assert_eq!(body["is_favorited"], true);
    assert_eq!(body["is_in_shopping_cart"], true);
    assert_eq!(body["author"]["is_subscribed"], true);

    for viewer in [None, Some(&author)] {
        let body: Value = app.get(&path, viewer).await.json().await.unwrap();
        assert_eq!(body["is_favorited"], false);
        assert_eq!(body["is_in_shopping_cart"], false);
        assert_eq!(body["author"]["is_subscribed"], false);
    }

    let body: Value = app
        .get(&format!("/api/users/{}/", author.id), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["is_subscribed"], false);
}

#[tokio::test]
async fn cannot_follow_self() {
    let app = spawn_app().await;
    let user = app.register("narcissus").await;
    let path = format!("/api/users/{}/subscribe/", user.id);

    assert_eq!(app.post(&path, Some(&user), json!({})).await.status(), 400);
    assert_eq!(app.post(&path, None, json!({})).await.status(), 401);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn follow_lifecycle_and_subscription_list() {
    let app = spawn_app().await;
    let ids = app.seed_ingredients(&[("Salt", "g")]).await;
    let author = app.register("author").await;
    let reader = app.register("reader").await;
    for n in 0..3 {
        app.create_recipe(&author, &format!("Dish {n}"), json!([{"id": ids[0], "amount": 1}]))
            .await;
    }
    let path = format!("/api/users/{}/subscribe/", author.id);

    let response = app
        .post(&format!("{path}?recipes_limit=2"), Some(&reader), json!({}))
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], author.id);
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 3);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);

    assert_eq!(app.post(&path, Some(&reader), json!({})).await.status(), 400);

    let body: Value = app
        .get("/api/users/subscriptions/?recipes_limit=1", Some(&reader))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["username"], "author");
    assert_eq!(body["results"][0]["recipes"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["recipes_count"], 3);

    assert_eq!(app.delete(&path, Some(&reader)).await.status(), 204);
    assert_eq!(app.delete(&path, Some(&reader)).await.status(), 400);
    assert_eq!(
        app.post("/api/users/4242/subscribe/", Some(&reader), json!({}))
            .await
            .status(),
        404
    );
    assert_eq!(
        app.get("/api/users/subscriptions/", None).await.status(),
        401
    );
}

#[tokio::test]
async fn shopping_list_sums_shared_ingredients() {
    let app = spawn_app().await;
    let ids = app
        .seed_ingredients(&[("Salt", "g"), ("Water", "ml")])
        .await;
    let author = app.register("author").await;
    let shopper = app.register("shopper").await;
    let first = app
        .create_recipe(&author, "Brine", json!([{"id": ids[0], "amount": 5}, {"id": ids[1], "amount": 100}]))
        .await;
    let second = app
        .create_recipe(&author, "Seasoning", json!([{"id": ids[0], "amount": 3}]))
        .await;
    for recipe_id in [first, second] {
        let response = app
            .post(
                &format!("/api/recipes/{recipe_id}/shopping_cart/"),
                Some(&shopper),
                json!({}),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let response = app
        .get("/api/recipes/download_shopping_cart/", Some(&shopper))
        .await;
    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("shopping_list.txt"));
    let text = response.text().await.unwrap();
    let salt_lines: Vec<&str> = text.lines().filter(|line| line.starts_with("Salt")).collect();
    assert_eq!(salt_lines, vec!["Salt — 8 g"]);
    assert_eq!(text, "Salt — 8 g\nWater — 100 ml");

    assert_eq!(
        app.get("/api/recipes/download_shopping_cart/", None)
            .await
            .status(),
        401
    );
}

#[tokio::test]
async fn registration_validates_and_enforces_uniqueness() {
    let app = spawn_app().await;
    app.register("chef").await;

    let response = app
        .post(
            "/api/users/",
            None,
            json!({
                "email": "chef@example.com",
                "username": "other",
                "first_name": "A",
                "last_name": "B",
                "password": "pass-pass-123",
            }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["email"].is_array());

    let response = app
        .post(
            "/api/users/",
            None,
            json!({
                "email": "other@example.com",
                "username": "chef",
                "first_name": "A",
                "last_name": "B",
                "password": "pass-pass-123",
            }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["username"].is_array());

    let response = app
        .post("/api/users/", None, json!({"email": "x@example.com", "username": "bad name"}))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn me_and_password_change() {
    let app = spawn_app().await;
    let user = app.register("cook").await;

    assert_eq!(app.get("/api/users/me/", None).await.status(), 401);
    let body: Value = app.get("/api/users/me/", Some(&user)).await.json().await.unwrap();
    assert_eq!(body["username"], "cook");
    assert_eq!(body["email"], "cook@example.com");
    assert!(body["avatar"].is_null());

    let response = app
        .post(
            "/api/users/set_password/",
            Some(&user),
            json!({"current_password": "wrong", "new_password": "new-secret-456"}),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post(
            "/api/users/set_password/",
            Some(&user),
            json!({"current_password": "correct-horse-battery", "new_password": "new-secret-456"}),
        )
        .await;
    assert_eq!(response.status(), 204);

    let response = app
        .post(
            "/api/auth/token/login/",
            None,
            json!({"email": "cook@example.com", "password": "correct-horse-battery"}),
        )
        .await;
    assert_eq!(response.status(), 400);
    let response = app
        .post(
            "/api/auth/token/login/",
            None,
            json!({"email": "cook@example.com", "password": "new-secret-456"}),
        )
        .await;
    assert_eq!(response.status(), 200);

    assert_eq!(
        app.post("/api/auth/token/logout/", Some(&user), json!({}))
            .await
            .status(),
        204
    );
}

#[tokio::test]
async fn avatar_upload_and_removal() {
    let app = spawn_app().await;
    let user = app.register("cook").await;

    let response = app
        .put("/api/users/me/avatar/", Some(&user), json!({"avatar": "garbage"}))
        .await;
    assert_eq!(response.status(), 400);
    let response = app.put("/api/users/me/avatar/", Some(&user), json!({})).await;
    assert_eq!(response.status(), 400);

    let response = app
        .put("/api/users/me/avatar/", Some(&user), json!({"avatar": PIXEL}))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let avatar = body["avatar"].as_str().unwrap().to_string();
    assert!(avatar.contains("/media/users_images/"), "{avatar}");
    let media_path = avatar.split_once("/media/").unwrap().1.to_string();
    assert_eq!(
        app.get(&format!("/media/{media_path}"), None).await.status(),
        200
    );

    let body: Value = app.get("/api/users/me/", Some(&user)).await.json().await.unwrap();
    assert_eq!(body["avatar"], avatar.as_str());

    assert_eq!(
        app.delete("/api/users/me/avatar/", Some(&user)).await.status(),
        204
    );
    let body: Value = app.get("/api/users/me/", Some(&user)).await.json().await.unwrap();
    assert!(body["avatar"].is_null());
    assert_eq!(
        app.get(&format!("/media/{media_path}"), None).await.status(),
        404
    );
}

#[tokio::test]
async fn user_list_is_paginated() {
    let app = spawn_app().await;
    for n in 0..8 {
        app.register(&format!("user{n}")).await;
    }
    let body: Value = app.get("/api/users/?limit=3&offset=3", None).await.json().await.unwrap();
    assert_eq!(body["count"], 8);
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
    assert_eq!(body["results"][0]["username"], "user3");
    assert!(body["next"].as_str().unwrap().contains("/api/users/?limit=3&offset=6"));
    assert!(body["previous"].as_str().unwrap().ends_with("/api/users/?limit=3"));

    assert_eq!(app.get("/api/users/4242/", None).await.status(), 404);
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/api/recipes/"))
        .header("Authorization", "Token not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(app.get("/check_health", None).await.status(), 200);
}

#[tokio::test]
async fn account_bodies_with_wrong_types_are_bad_requests() {
    let app = spawn_app().await;
    let response = app
        .post("/api/users/", None, json!({"email": 5, "username": ["cook"]}))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["email"].is_array(), "{body}");

    let response = app
        .client
        .post(app.url("/api/auth/token/login/"))
        .body("email=a&password=b")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["non_field_errors"].is_array(), "{body}");
}

use sqlx::SqlitePool;

use crate::{data_formats::Page, errors::RequestError, models::Profile};

/// The three user-owned relations that are toggled on and off: favorites,
/// the shopping cart and follows. Each row is unique per (user, target).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Favorite,
    ShoppingCart,
    Follow,
}

impl Membership {
    fn table(self) -> &'static str {
        match self {
            Membership::Favorite => "featured",
            Membership::ShoppingCart => "shopping_list",
            Membership::Follow => "follows",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            Membership::Favorite | Membership::ShoppingCart => "recipe_id",
            Membership::Follow => "following_id",
        }
    }

    pub fn already_present(self) -> &'static str {
        match self {
            Membership::Favorite => "Recipe is already in favorites.",
            Membership::ShoppingCart => "Recipe is already in the shopping cart.",
            Membership::Follow => "You are already subscribed to this user.",
        }
    }

    pub fn not_present(self) -> &'static str {
        match self {
            Membership::Favorite => "Recipe is not in favorites.",
            Membership::ShoppingCart => "Recipe is not in the shopping cart.",
            Membership::Follow => "You are not subscribed to this user.",
        }
    }
}

pub async fn membership_exists_in_db(
    pool: &SqlitePool,
    relation: Membership,
    user_id: i64,
    target_id: i64,
) -> Result<bool, RequestError> {
    let query = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2)",
        relation.table(),
        relation.target_column()
    );
    let exists = sqlx::query_scalar::<_, bool>(&query)
        .bind(user_id)
        .bind(target_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Adds the (user, target) row. An existing row, including one inserted by a
/// concurrent request between the check and the insert, is a bad request.
pub async fn add_membership_in_db(
    pool: &SqlitePool,
    relation: Membership,
    user_id: i64,
    target_id: i64,
) -> Result<(), RequestError> {
    if membership_exists_in_db(pool, relation, user_id, target_id).await? {
        return Err(RequestError::BadRequest(relation.already_present()));
    }
    let mut tx = pool.begin().await?;
    let query = format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2)",
        relation.table(),
        relation.target_column()
    );
    sqlx::query(&query)
        .bind(user_id)
        .bind(target_id)
        .execute(&mut tx)
        .await
        .map_err(|e| {
            let e = RequestError::from(e);
            if e.unique_violation().is_some() {
                RequestError::BadRequest(relation.already_present())
            } else {
                e
            }
        })?;
    tx.commit().await?;
    tracing::info!(?relation, user_id, target_id, "membership added");
    Ok(())
}

pub async fn remove_membership_in_db(
    pool: &SqlitePool,
    relation: Membership,
    user_id: i64,
    target_id: i64,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        relation.table(),
        relation.target_column()
    );
    let result = sqlx::query(&query)
        .bind(user_id)
        .bind(target_id)
        .execute(&mut tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::BadRequest(relation.not_present()));
    }
    tx.commit().await?;
    tracing::info!(?relation, user_id, target_id, "membership removed");
    Ok(())
}

/// Users followed by `user_id`, in the order they were followed.
pub async fn list_subscriptions_in_db(
    pool: &SqlitePool,
    user_id: i64,
    Page { limit, offset }: Page,
) -> Result<(Vec<Profile>, i64), RequestError> {
    let mut tx = pool.begin().await?;
    let profiles = sqlx::query_as::<_, Profile>(
        r#"
        SELECT users.id,
               users.email,
               users.username,
               users.first_name,
               users.last_name,
               users.avatar,
               1 AS is_subscribed
        FROM   follows
               JOIN users
                 ON users.id = follows.following_id
        WHERE  follows.user_id = $1
        ORDER  BY follows.id
        LIMIT  $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut tx)
    .await?;
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok((profiles, count))
}

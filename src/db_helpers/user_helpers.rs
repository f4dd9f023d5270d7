use sqlx::SqlitePool;

use crate::{
    data_formats::{NewUser, Page},
    errors::RequestError,
    models::{Profile, User},
};

use super::USER_COLUMNS;

const PROFILE_QUERY: &str = r#"
            SELECT users.id,
                   users.email,
                   users.username,
                   users.first_name,
                   users.last_name,
                   users.avatar,
                   EXISTS (SELECT 1
                           FROM   follows
                           WHERE  follows.following_id = users.id
                              AND follows.user_id = $1) AS is_subscribed
            FROM   users
"#;

/// Inserts a user whose password has already been hashed.
pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    );
    let user = sqlx::query_as::<_, User>(&query)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(user)
}

pub async fn get_profile_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    id: i64,
) -> Result<Option<Profile>, RequestError> {
    let query = format!("{PROFILE_QUERY} WHERE users.id = $2");
    let result = sqlx::query_as::<_, Profile>(&query)
        .bind(viewer)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn list_profiles_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    Page { limit, offset }: Page,
) -> Result<(Vec<Profile>, i64), RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!("{PROFILE_QUERY} ORDER BY users.id LIMIT $2 OFFSET $3");
    let profiles = sqlx::query_as::<_, Profile>(&query)
        .bind(viewer)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut tx)
        .await?;
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok((profiles, count))
}

pub async fn update_password_in_db(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(&mut tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("User not found."));
    }
    tx.commit().await?;
    Ok(())
}

/// Sets (or clears) the avatar and returns the path it replaced.
pub async fn replace_avatar_in_db(
    pool: &SqlitePool,
    id: i64,
    avatar: Option<&str>,
) -> Result<Option<String>, RequestError> {
    let mut tx = pool.begin().await?;
    let previous = sqlx::query_scalar::<_, Option<String>>("SELECT avatar FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or(RequestError::NotFound("User not found."))?;
    sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(avatar)
        .bind(id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(previous)
}

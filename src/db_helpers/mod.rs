use sqlx::SqlitePool;

use crate::{errors::RequestError, models::User};

mod ingredient_helpers;
mod membership_helpers;
mod recipe_helpers;
mod shopping_helpers;
mod user_helpers;

pub use ingredient_helpers::*;
pub use membership_helpers::*;
pub use recipe_helpers::*;
pub use shopping_helpers::*;
pub use user_helpers::*;

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, password, avatar";

// ----------------- Helper Functions -----------------

pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let result = sqlx::query_as::<_, User>(&query)
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let result = sqlx::query_as::<_, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

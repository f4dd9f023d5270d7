use sqlx::SqlitePool;

use crate::{errors::RequestError, models::CartLine};

/// One row per ingredient link of every recipe in the user's cart, not yet grouped.
pub async fn get_cart_lines_in_db(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<CartLine>, RequestError> {
    let result = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ingredients.name,
               ingredients.measurement_unit,
               recipe_ingredients.amount
        FROM   shopping_list
               JOIN recipe_ingredients
                 ON recipe_ingredients.recipe_id = shopping_list.recipe_id
               JOIN ingredients
                 ON ingredients.id = recipe_ingredients.ingredient_id
        WHERE  shopping_list.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(result)
}

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::data_formats::{IngredientAmount, NewRecipe, Page, RecipeChanges, RecipeFilters};
use crate::errors::{FieldErrors, RequestError};
use crate::models::{Recipe, RecipeIngredient, ShortRecipe};

use super::ingredient_helpers::missing_ingredient_ids;

pub type RecipeWithIngredients = (Recipe, Vec<RecipeIngredient>);

/// Recipe columns with the author summary and the viewer-scoped flags. An
/// anonymous viewer binds NULL, which makes every EXISTS false.
fn push_recipe_select(query: &mut QueryBuilder<'_, Sqlite>, viewer: Option<i64>) {
    query
        .push(
            r#"
            SELECT recipes.id,
                   recipes.author_id,
                   recipes.name,
                   recipes.image,
                   recipes.text,
                   recipes.cooking_time,
                   users.email      AS author_email,
                   users.username   AS author_username,
                   users.first_name AS author_first_name,
                   users.last_name  AS author_last_name,
                   users.avatar     AS author_avatar,
                   EXISTS (SELECT 1
                           FROM   featured
                           WHERE  featured.recipe_id = recipes.id
                              AND featured.user_id = "#,
        )
        .push_bind(viewer)
        .push(
            r#") AS is_favorited,
                   EXISTS (SELECT 1
                           FROM   shopping_list
                           WHERE  shopping_list.recipe_id = recipes.id
                              AND shopping_list.user_id = "#,
        )
        .push_bind(viewer)
        .push(
            r#") AS is_in_shopping_cart,
                   EXISTS (SELECT 1
                           FROM   follows
                           WHERE  follows.following_id = recipes.author_id
                              AND follows.user_id = "#,
        )
        .push_bind(viewer)
        .push(
            r#") AS author_is_subscribed
            FROM   recipes
                   JOIN users
                     ON users.id = recipes.author_id"#,
        );
}

fn push_recipe_filters(query: &mut QueryBuilder<'_, Sqlite>, filters: RecipeFilters) {
    query.push(" WHERE 1 = 1");
    if let Some(author) = filters.author {
        query.push(" AND recipes.author_id = ").push_bind(author);
    }
    if let Some(user) = filters.favorited_by {
        query
            .push(" AND EXISTS (SELECT 1 FROM featured WHERE featured.recipe_id = recipes.id AND featured.user_id = ")
            .push_bind(user)
            .push(")");
    }
    if let Some(user) = filters.in_cart_of {
        query
            .push(" AND EXISTS (SELECT 1 FROM shopping_list WHERE shopping_list.recipe_id = recipes.id AND shopping_list.user_id = ")
            .push_bind(user)
            .push(")");
    }
}

async fn get_ingredients_for_recipes(
    pool: &SqlitePool,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<RecipeIngredient>>, RequestError> {
    let mut grouped: HashMap<i64, Vec<RecipeIngredient>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(grouped);
    }
    let mut query = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT recipe_ingredients.recipe_id,
               ingredients.id,
               ingredients.name,
               ingredients.measurement_unit,
               recipe_ingredients.amount
        FROM   recipe_ingredients
               JOIN ingredients
                 ON ingredients.id = recipe_ingredients.ingredient_id
        WHERE  recipe_ingredients.recipe_id IN ("#,
    );
    let mut separated = query.separated(", ");
    for id in recipe_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY recipe_ingredients.id");
    let rows = query
        .build_query_as::<RecipeIngredient>()
        .fetch_all(pool)
        .await?;
    for row in rows {
        grouped.entry(row.recipe_id).or_default().push(row);
    }
    Ok(grouped)
}

pub async fn get_recipe_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    id: i64,
) -> Result<Option<RecipeWithIngredients>, RequestError> {
    let mut query = QueryBuilder::<Sqlite>::new("");
    push_recipe_select(&mut query, viewer);
    query.push(" WHERE recipes.id = ").push_bind(id);
    let recipe = match query.build_query_as::<Recipe>().fetch_optional(pool).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };
    let ingredients = get_ingredients_for_recipes(pool, &[recipe.id])
        .await?
        .remove(&recipe.id)
        .unwrap_or_default();
    Ok(Some((recipe, ingredients)))
}

/// Newest first.
pub async fn list_recipes_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    filters: RecipeFilters,
    Page { limit, offset }: Page,
) -> Result<(Vec<RecipeWithIngredients>, i64), RequestError> {
    let mut query = QueryBuilder::<Sqlite>::new("");
    push_recipe_select(&mut query, viewer);
    push_recipe_filters(&mut query, filters);
    query
        .push(" ORDER BY recipes.pub_date DESC, recipes.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let recipes = query.build_query_as::<Recipe>().fetch_all(pool).await?;

    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes");
    push_recipe_filters(&mut count_query, filters);
    let (count,): (i64,) = count_query.build_query_as().fetch_one(pool).await?;

    let ids: Vec<i64> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut ingredients = get_ingredients_for_recipes(pool, &ids).await?;
    let result = recipes
        .into_iter()
        .map(|recipe| {
            let items = ingredients.remove(&recipe.id).unwrap_or_default();
            (recipe, items)
        })
        .collect();
    Ok((result, count))
}

async fn check_ingredients_exist(
    tx: &mut Transaction<'_, Sqlite>,
    ingredients: &[IngredientAmount],
) -> Result<(), RequestError> {
    let ids: Vec<i64> = ingredients.iter().map(|item| item.id).collect();
    let missing = missing_ingredient_ids(tx, &ids).await?;
    let mut errors = FieldErrors::new();
    for id in missing {
        errors.add("ingredients", format!("Ingredient {id} does not exist."));
    }
    errors.into_result()
}

async fn insert_recipe_ingredients(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: i64,
    ingredients: &[IngredientAmount],
) -> Result<(), RequestError> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
    );
    query.push_values(ingredients, |mut row, item| {
        row.push_bind(recipe_id)
            .push_bind(item.id)
            .push_bind(item.amount);
    });
    query.build().execute(&mut *tx).await?;
    Ok(())
}

/// Inserts the recipe and all of its join rows in one transaction.
pub async fn create_recipe_in_db(
    pool: &SqlitePool,
    author_id: i64,
    recipe: &NewRecipe,
    image_path: &str,
) -> Result<i64, RequestError> {
    let mut tx = pool.begin().await?;
    check_ingredients_exist(&mut tx, &recipe.ingredients).await?;

    let recipe_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(image_path)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut tx)
    .await?;

    insert_recipe_ingredients(&mut tx, recipe_id, &recipe.ingredients).await?;
    tx.commit().await?;
    tracing::info!(
        recipe_id,
        author_id,
        ingredients = recipe.ingredients.len(),
        "recipe created"
    );
    Ok(recipe_id)
}

/// Patches the scalar columns that are present and replaces the ingredient set wholesale.
pub async fn update_recipe_in_db(
    pool: &SqlitePool,
    id: i64,
    changes: &RecipeChanges,
    image_path: Option<&str>,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    check_ingredients_exist(&mut tx, &changes.ingredients).await?;

    let mut query = QueryBuilder::<Sqlite>::new("UPDATE recipes SET id = id");
    if let Some(name) = &changes.name {
        query.push(", name = ").push_bind(name);
    }
    if let Some(text) = &changes.text {
        query.push(", text = ").push_bind(text);
    }
    if let Some(cooking_time) = changes.cooking_time {
        query.push(", cooking_time = ").push_bind(cooking_time);
    }
    if let Some(image_path) = image_path {
        query.push(", image = ").push_bind(image_path);
    }
    query.push(" WHERE id = ").push_bind(id);
    let result = query.build().execute(&mut tx).await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Recipe not found."));
    }

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut tx)
        .await?;
    insert_recipe_ingredients(&mut tx, id, &changes.ingredients).await?;
    tx.commit().await?;
    tracing::info!(
        recipe_id = id,
        ingredients = changes.ingredients.len(),
        "recipe updated"
    );
    Ok(())
}

/// Join rows, favorites and cart entries go with it through ON DELETE CASCADE.
pub async fn delete_recipe_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Recipe not found."));
    }
    tx.commit().await?;
    tracing::info!(recipe_id = id, "recipe deleted");
    Ok(())
}

pub async fn get_short_recipe_in_db(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ShortRecipe>, RequestError> {
    let result = sqlx::query_as::<_, ShortRecipe>(
        "SELECT id, author_id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(result)
}

/// The author's recipes, newest first, optionally truncated.
pub async fn get_author_recipes_in_db(
    pool: &SqlitePool,
    author_id: i64,
    limit: Option<i64>,
) -> Result<(Vec<ShortRecipe>, i64), RequestError> {
    let mut tx = pool.begin().await?;
    // SQLite treats a negative LIMIT as no limit.
    let recipes = sqlx::query_as::<_, ShortRecipe>(
        r#"
        SELECT id, author_id, name, image, cooking_time FROM recipes
        WHERE author_id = $1
        ORDER BY pub_date DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(author_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(&mut tx)
    .await?;
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok((recipes, count))
}

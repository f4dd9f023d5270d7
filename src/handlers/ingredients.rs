use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use sqlx::SqlitePool;

use crate::{
    data_formats::{IngredientQueryParams, IngredientResponse},
    db_helpers::{get_ingredient_in_db, search_ingredients_in_db},
    errors::RequestError,
};

use super::JsonResult;

pub async fn list_ingredients(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Query(params): Query<IngredientQueryParams>,
) -> JsonResult<Vec<IngredientResponse>> {
    let ingredients = search_ingredients_in_db(&pool, params.name.as_deref()).await?;
    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

pub async fn get_ingredient(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(id): Path<i64>,
) -> JsonResult<IngredientResponse> {
    let ingredient = get_ingredient_in_db(&pool, id)
        .await?
        .ok_or(RequestError::NotFound("Ingredient not found."))?;
    Ok(Json(ingredient.into()))
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use sqlx::SqlitePool;

use crate::{
    authentication::{AuthUser, MaybeUser},
    config::AppConfig,
    data_formats::{
        CreateRecipeRequest, Paginated, RecipeQueryParams, RecipeResponse, ShortLinkResponse,
        ShortRecipeResponse, UpdateRecipeRequest,
    },
    db_helpers::{
        add_membership_in_db, create_recipe_in_db, delete_recipe_in_db, get_cart_lines_in_db,
        get_recipe_in_db, get_short_recipe_in_db, list_recipes_in_db, remove_membership_in_db,
        update_recipe_in_db, Membership,
    },
    errors::RequestError,
    extract::JsonBody,
    images::{remove_image, store_image, RECIPE_IMAGES},
    models::ShortRecipe,
    shopping_list::{aggregate_cart, render_shopping_list, SHOPPING_LIST_FILENAME},
    site::{encode_short_code, SiteUrl},
};

use super::JsonResult;

const RECIPE_NOT_FOUND: &str = "Recipe not found.";

async fn render_recipe(
    pool: &SqlitePool,
    viewer: Option<i64>,
    id: i64,
    site: &SiteUrl,
) -> Result<RecipeResponse, RequestError> {
    let (recipe, ingredients) = get_recipe_in_db(pool, viewer, id)
        .await?
        .ok_or(RequestError::NotFound(RECIPE_NOT_FOUND))?;
    Ok(RecipeResponse::new(recipe, ingredients, site))
}

/// Loads the recipe and checks that `user` wrote it.
async fn authored_recipe(
    pool: &SqlitePool,
    user: &AuthUser,
    id: i64,
) -> Result<ShortRecipe, RequestError> {
    let recipe = get_short_recipe_in_db(pool, id)
        .await?
        .ok_or(RequestError::NotFound(RECIPE_NOT_FOUND))?;
    if recipe.author_id != user.id {
        tracing::debug!(recipe_id = id, user_id = user.id, "edit by non-author refused");
        return Err(RequestError::Forbidden);
    }
    Ok(recipe)
}

// ----------------- Recipe Handlers -----------------
pub async fn list_recipes(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Query(params): Query<RecipeQueryParams>,
) -> JsonResult<Paginated<RecipeResponse>> {
    let viewer = maybe_user.get_id();
    let page = params.page();
    let (recipes, count) =
        list_recipes_in_db(&pool, viewer, params.filters(viewer), page).await?;
    let results = recipes
        .into_iter()
        .map(|(recipe, ingredients)| RecipeResponse::new(recipe, ingredients, &site))
        .collect();
    Ok(Json(Paginated::new(results, count, page, &site)))
}

pub async fn get_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Path(id): Path<i64>,
) -> JsonResult<RecipeResponse> {
    Ok(Json(
        render_recipe(&pool, maybe_user.get_id(), id, &site).await?,
    ))
}

pub async fn create_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<AppConfig>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    JsonBody(request): JsonBody<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), RequestError> {
    let user = maybe_user.require()?;
    let recipe = request.validate()?;
    let image_path = store_image(&config.media_root, RECIPE_IMAGES, &recipe.image).await?;
    let id = match create_recipe_in_db(&pool, user.id, &recipe, &image_path).await {
        Ok(id) => id,
        Err(e) => {
            remove_image(&config.media_root, &image_path).await;
            return Err(e);
        }
    };
    let response = render_recipe(&pool, Some(user.id), id, &site).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<AppConfig>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<UpdateRecipeRequest>,
) -> JsonResult<RecipeResponse> {
    let user = maybe_user.require()?;
    let existing = authored_recipe(&pool, &user, id).await?;
    let changes = request.validate()?;

    let new_image = match &changes.image {
        Some(image) => Some(store_image(&config.media_root, RECIPE_IMAGES, image).await?),
        None => None,
    };
    if let Err(e) = update_recipe_in_db(&pool, id, &changes, new_image.as_deref()).await {
        if let Some(path) = &new_image {
            remove_image(&config.media_root, path).await;
        }
        return Err(e);
    }
    if new_image.is_some() {
        remove_image(&config.media_root, &existing.image).await;
    }
    Ok(Json(render_recipe(&pool, Some(user.id), id, &site).await?))
}

pub async fn delete_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<AppConfig>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    let user = maybe_user.require()?;
    let existing = authored_recipe(&pool, &user, id).await?;
    delete_recipe_in_db(&pool, id).await?;
    remove_image(&config.media_root, &existing.image).await;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------- Favorite / Cart Handlers -----------------
async fn add_recipe_membership(
    pool: &SqlitePool,
    relation: Membership,
    maybe_user: MaybeUser,
    id: i64,
    site: &SiteUrl,
) -> Result<(StatusCode, Json<ShortRecipeResponse>), RequestError> {
    let user = maybe_user.require()?;
    let recipe = get_short_recipe_in_db(pool, id)
        .await?
        .ok_or(RequestError::NotFound(RECIPE_NOT_FOUND))?;
    add_membership_in_db(pool, relation, user.id, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ShortRecipeResponse::new(recipe, site)),
    ))
}

async fn remove_recipe_membership(
    pool: &SqlitePool,
    relation: Membership,
    maybe_user: MaybeUser,
    id: i64,
) -> Result<StatusCode, RequestError> {
    let user = maybe_user.require()?;
    if get_short_recipe_in_db(pool, id).await?.is_none() {
        return Err(RequestError::NotFound(RECIPE_NOT_FOUND));
    }
    remove_membership_in_db(pool, relation, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ShortRecipeResponse>), RequestError> {
    add_recipe_membership(&pool, Membership::Favorite, maybe_user, id, &site).await
}

pub async fn remove_favorite(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    remove_recipe_membership(&pool, Membership::Favorite, maybe_user, id).await
}

pub async fn add_to_shopping_cart(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ShortRecipeResponse>), RequestError> {
    add_recipe_membership(&pool, Membership::ShoppingCart, maybe_user, id, &site).await
}

pub async fn remove_from_shopping_cart(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    remove_recipe_membership(&pool, Membership::ShoppingCart, maybe_user, id).await
}

pub async fn download_shopping_cart(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
) -> Result<impl IntoResponse, RequestError> {
    let user = maybe_user.require()?;
    let lines = aggregate_cart(get_cart_lines_in_db(&pool, user.id).await?);
    tracing::debug!(user_id = user.id, lines = lines.len(), "shopping list rendered");
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
            ),
        ],
        render_shopping_list(&lines),
    ))
}

// ----------------- Short Link Handlers -----------------
pub async fn get_short_link(
    Extension(pool): Extension<Arc<SqlitePool>>,
    site: SiteUrl,
    Path(id): Path<i64>,
) -> JsonResult<ShortLinkResponse> {
    if get_short_recipe_in_db(&pool, id).await?.is_none() {
        return Err(RequestError::NotFound(RECIPE_NOT_FOUND));
    }
    let short_link = site.absolute(&format!("/s/{}", encode_short_code(id)));
    Ok(Json(ShortLinkResponse { short_link }))
}

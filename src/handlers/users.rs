use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use sqlx::SqlitePool;

use crate::{
    authentication::{get_jwt_token, hash_password_argon2, verify_password_argon2, MaybeUser},
    config::AppConfig,
    data_formats::{
        AvatarRequest, AvatarResponse, LoginRequest, PageQueryParams, Paginated, ProfileResponse,
        RecipesLimitParams, RegisterRequest, SetPasswordRequest, ShortRecipeResponse,
        SubscriptionQueryParams, SubscriptionResponse, TokenResponse, UserResponse,
    },
    db_helpers::{
        add_membership_in_db, get_author_recipes_in_db, get_profile_in_db, get_user_by_email,
        get_user_by_id, insert_user, list_profiles_in_db, list_subscriptions_in_db,
        remove_membership_in_db, replace_avatar_in_db, update_password_in_db, Membership,
    },
    errors::{FieldErrors, RequestError},
    extract::JsonBody,
    images::{remove_image, store_image, USER_IMAGES},
    models::Profile,
    site::SiteUrl,
};

use super::JsonResult;

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

// ----------------- Auth Handlers -----------------
pub async fn login_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<AppConfig>>,
    JsonBody(LoginRequest { email, password }): JsonBody<LoginRequest>,
) -> JsonResult<TokenResponse> {
    let user = get_user_by_email(&pool, &email)
        .await?
        .ok_or(RequestError::BadRequest(INVALID_CREDENTIALS))?;
    let is_password_correct = verify_password_argon2(password, &user.password)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = user.id, "password verification failed");
            RequestError::ServerError
        })?;
    if !is_password_correct {
        tracing::debug!(user_id = user.id, "wrong password");
        return Err(RequestError::BadRequest(INVALID_CREDENTIALS));
    }
    let auth_token = get_jwt_token(user.id, &config.jwt_secret).map_err(|e| {
        tracing::error!(error = %e, "could not issue token");
        RequestError::ServerError
    })?;
    Ok(Json(TokenResponse { auth_token }))
}

/// Tokens are stateless, so logging out only checks that the caller was logged in.
pub async fn logout_user(maybe_user: MaybeUser) -> Result<StatusCode, RequestError> {
    let user = maybe_user.require()?;
    tracing::debug!(user_id = user.id, "logout");
    Ok(StatusCode::NO_CONTENT)
}

// ----------------- User Handlers -----------------
pub async fn register_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), RequestError> {
    let mut user = request.validate()?;
    user.password = hash_password_argon2(user.password).await.map_err(|e| {
        tracing::error!(error = %e, "could not hash password");
        RequestError::ServerError
    })?;

    let user = insert_user(&pool, &user)
        .await
        .map_err(|e| match e.unique_violation() {
            Some(message) if message.contains("users.email") => {
                FieldErrors::single("email", "A user with that email already exists.")
            }
            Some(_) => FieldErrors::single("username", "A user with that username already exists."),
            None => e,
        })?;
    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::new(user))))
}

pub async fn list_users(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Query(params): Query<PageQueryParams>,
) -> JsonResult<Paginated<ProfileResponse>> {
    let page = params.page();
    let (profiles, count) = list_profiles_in_db(&pool, maybe_user.get_id(), page).await?;
    let results = profiles
        .into_iter()
        .map(|profile| ProfileResponse::new(profile, &site))
        .collect();
    Ok(Json(Paginated::new(results, count, page, &site)))
}

pub async fn get_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Path(id): Path<i64>,
) -> JsonResult<ProfileResponse> {
    let profile = get_profile_in_db(&pool, maybe_user.get_id(), id)
        .await?
        .ok_or(RequestError::NotFound("User not found."))?;
    Ok(Json(ProfileResponse::new(profile, &site)))
}

pub async fn get_current_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
) -> JsonResult<ProfileResponse> {
    let user = maybe_user.require()?;
    let profile = get_profile_in_db(&pool, Some(user.id), user.id)
        .await?
        .ok_or(RequestError::NotAuthorized("User no longer exists."))?;
    Ok(Json(ProfileResponse::new(profile, &site)))
}

pub async fn set_password(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    JsonBody(request): JsonBody<SetPasswordRequest>,
) -> Result<StatusCode, RequestError> {
    let user = maybe_user.require()?;
    let (current_password, new_password) = request.validate()?;
    let stored = get_user_by_id(&pool, user.id)
        .await?
        .ok_or(RequestError::NotAuthorized("User no longer exists."))?;
    let is_password_correct = verify_password_argon2(current_password, &stored.password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    if !is_password_correct {
        return Err(FieldErrors::single("current_password", "Invalid password."));
    }
    let hash = hash_password_argon2(new_password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    update_password_in_db(&pool, user.id, &hash).await?;
    tracing::info!(user_id = user.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

// ----------------- Avatar Handlers -----------------
pub async fn update_avatar(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<AppConfig>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    JsonBody(request): JsonBody<AvatarRequest>,
) -> JsonResult<AvatarResponse> {
    let user = maybe_user.require()?;
    let image = request.validate()?;
    let path = store_image(&config.media_root, USER_IMAGES, &image).await?;
    let previous = match replace_avatar_in_db(&pool, user.id, Some(&path)).await {
        Ok(previous) => previous,
        Err(e) => {
            remove_image(&config.media_root, &path).await;
            return Err(e);
        }
    };
    if let Some(previous) = previous {
        remove_image(&config.media_root, &previous).await;
    }
    Ok(Json(AvatarResponse {
        avatar: site.media(&path),
    }))
}

pub async fn delete_avatar(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<AppConfig>>,
    maybe_user: MaybeUser,
) -> Result<StatusCode, RequestError> {
    let user = maybe_user.require()?;
    if let Some(previous) = replace_avatar_in_db(&pool, user.id, None).await? {
        remove_image(&config.media_root, &previous).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

// ----------------- Subscription Handlers -----------------
async fn subscription_view(
    pool: &SqlitePool,
    profile: Profile,
    recipes_limit: Option<u32>,
    site: &SiteUrl,
) -> Result<SubscriptionResponse, RequestError> {
    let (recipes, recipes_count) =
        get_author_recipes_in_db(pool, profile.id, recipes_limit.map(i64::from)).await?;
    Ok(SubscriptionResponse {
        profile: ProfileResponse::new(profile, site),
        recipes: recipes
            .into_iter()
            .map(|recipe| ShortRecipeResponse::new(recipe, site))
            .collect(),
        recipes_count,
    })
}

pub async fn list_subscriptions(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Query(params): Query<SubscriptionQueryParams>,
) -> JsonResult<Paginated<SubscriptionResponse>> {
    let user = maybe_user.require()?;
    let page = params.page();
    let (profiles, count) = list_subscriptions_in_db(&pool, user.id, page).await?;
    let mut results = Vec::with_capacity(profiles.len());
    for profile in profiles {
        results.push(subscription_view(&pool, profile, params.recipes_limit, &site).await?);
    }
    Ok(Json(Paginated::new(results, count, page, &site)))
}

pub async fn subscribe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    site: SiteUrl,
    Path(id): Path<i64>,
    Query(params): Query<RecipesLimitParams>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), RequestError> {
    let user = maybe_user.require()?;
    if user.id == id {
        return Err(RequestError::BadRequest("You cannot subscribe to yourself."));
    }
    if get_user_by_id(&pool, id).await?.is_none() {
        return Err(RequestError::NotFound("User not found."));
    }
    add_membership_in_db(&pool, Membership::Follow, user.id, id).await?;
    let profile = get_profile_in_db(&pool, Some(user.id), id)
        .await?
        .ok_or(RequestError::NotFound("User not found."))?;
    let view = subscription_view(&pool, profile, params.recipes_limit, &site).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn unsubscribe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    let user = maybe_user.require()?;
    if user.id == id {
        return Err(RequestError::BadRequest("You cannot subscribe to yourself."));
    }
    if get_user_by_id(&pool, id).await?.is_none() {
        return Err(RequestError::NotFound("User not found."));
    }
    remove_membership_in_db(&pool, Membership::Follow, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

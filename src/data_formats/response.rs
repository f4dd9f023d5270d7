use serde::{Deserialize, Serialize};

use crate::models::{Ingredient, Profile, Recipe, RecipeIngredient, ShortRecipe, User};
use crate::site::SiteUrl;

#[derive(Deserialize, Serialize, Debug)]
pub struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct ProfileResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub recipes: Vec<ShortRecipeResponse>,
    pub recipes_count: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RecipeIngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct RecipeResponse {
    pub id: i64,
    pub author: ProfileResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ShortRecipeResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct TokenResponse {
    pub auth_token: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct AvatarResponse {
    pub avatar: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

impl UserResponse {
    pub fn new(
        User {
            email,
            id,
            username,
            first_name,
            last_name,
            ..
        }: User,
    ) -> Self {
        UserResponse {
            email,
            id,
            username,
            first_name,
            last_name,
        }
    }
}

impl ProfileResponse {
    pub fn new(
        Profile {
            id,
            email,
            username,
            first_name,
            last_name,
            avatar,
            is_subscribed,
        }: Profile,
        site: &SiteUrl,
    ) -> Self {
        ProfileResponse {
            email,
            id,
            username,
            first_name,
            last_name,
            is_subscribed,
            avatar: avatar.map(|path| site.media(&path)),
        }
    }
}

impl From<Ingredient> for IngredientResponse {
    fn from(
        Ingredient {
            id,
            name,
            measurement_unit,
        }: Ingredient,
    ) -> Self {
        IngredientResponse {
            id,
            name,
            measurement_unit,
        }
    }
}

impl From<RecipeIngredient> for RecipeIngredientResponse {
    fn from(
        RecipeIngredient {
            id,
            name,
            measurement_unit,
            amount,
            ..
        }: RecipeIngredient,
    ) -> Self {
        RecipeIngredientResponse {
            id,
            name,
            measurement_unit,
            amount,
        }
    }
}

impl ShortRecipeResponse {
    pub fn new(
        ShortRecipe {
            id,
            name,
            image,
            cooking_time,
            ..
        }: ShortRecipe,
        site: &SiteUrl,
    ) -> Self {
        ShortRecipeResponse {
            id,
            name,
            image: site.media(&image),
            cooking_time,
        }
    }
}

impl RecipeResponse {
    pub fn new(
        Recipe {
            id,
            author_id,
            name,
            image,
            text,
            cooking_time,
            is_favorited,
            is_in_shopping_cart,
            author_email,
            author_username,
            author_first_name,
            author_last_name,
            author_avatar,
            author_is_subscribed,
            ..
        }: Recipe,
        ingredients: Vec<RecipeIngredient>,
        site: &SiteUrl,
    ) -> Self {
        RecipeResponse {
            id,
            author: ProfileResponse {
                email: author_email,
                id: author_id,
                username: author_username,
                first_name: author_first_name,
                last_name: author_last_name,
                is_subscribed: author_is_subscribed,
                avatar: author_avatar.map(|path| site.media(&path)),
            },
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            is_favorited,
            is_in_shopping_cart,
            name,
            image: site.media(&image),
            text,
            cooking_time,
        }
    }
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{FieldErrors, RequestError};
use crate::images::{decode_data_uri, DecodedImage};

pub const MIN_AMOUNT: i64 = 1;
pub const MAX_AMOUNT: i64 = 32000;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 150;
const MAX_RECIPE_NAME_LENGTH: usize = 256;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

// ----------------- User Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct SetPasswordRequest {
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct AvatarRequest {
    pub avatar: Option<String>,
}

fn required_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<String>,
    max_length: usize,
) -> String {
    match value.map(|v| v.trim().to_string()) {
        None => {
            errors.add(field, REQUIRED);
            String::new()
        }
        Some(v) if v.is_empty() => {
            errors.add(field, BLANK);
            v
        }
        Some(v) => {
            if v.chars().count() > max_length {
                errors.add(
                    field,
                    format!("Ensure this field has no more than {max_length} characters."),
                );
            }
            v
        }
    }
}

pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, RequestError> {
        let mut errors = FieldErrors::new();
        let email = required_text(&mut errors, "email", self.email, MAX_EMAIL_LENGTH);
        if !errors.contains("email") && !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }
        let username = required_text(&mut errors, "username", self.username, MAX_NAME_LENGTH);
        if !errors.contains("username") && !is_valid_username(&username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        let first_name =
            required_text(&mut errors, "first_name", self.first_name, MAX_NAME_LENGTH);
        let last_name = required_text(&mut errors, "last_name", self.last_name, MAX_NAME_LENGTH);
        let password = match self.password {
            Some(password) if !password.is_empty() => password,
            Some(_) => {
                errors.add("password", BLANK);
                String::new()
            }
            None => {
                errors.add("password", REQUIRED);
                String::new()
            }
        };
        errors.into_result()?;
        Ok(NewUser {
            email: email.to_lowercase(),
            username,
            first_name,
            last_name,
            password,
        })
    }
}

impl SetPasswordRequest {
    /// Returns `(current_password, new_password)`.
    pub fn validate(self) -> Result<(String, String), RequestError> {
        let mut errors = FieldErrors::new();
        let current = self.current_password.unwrap_or_default();
        if current.is_empty() {
            errors.add("current_password", REQUIRED);
        }
        let new = self.new_password.unwrap_or_default();
        if new.is_empty() {
            errors.add("new_password", REQUIRED);
        }
        errors.into_result()?;
        Ok((current, new))
    }
}

impl AvatarRequest {
    pub fn validate(self) -> Result<DecodedImage, RequestError> {
        match self.avatar {
            Some(avatar) if !avatar.is_empty() => {
                decode_data_uri(&avatar).map_err(|message| FieldErrors::single("avatar", message))
            }
            _ => Err(FieldErrors::single("avatar", REQUIRED)),
        }
    }
}

// ----------------- Recipe Request -----------------
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct IngredientAmountRequest {
    pub id: Option<i64>,
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: i64,
    pub amount: i64,
}

#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct CreateRecipeRequest {
    pub ingredients: Option<Vec<IngredientAmountRequest>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

/// `PATCH` body: scalar fields are optional, the ingredient set is required
/// and replaces the stored one.
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct UpdateRecipeRequest {
    pub ingredients: Option<Vec<IngredientAmountRequest>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub image: DecodedImage,
    pub text: String,
    pub cooking_time: i64,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub image: Option<DecodedImage>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

fn in_amount_range(value: i64) -> Result<i64, String> {
    if value < MIN_AMOUNT {
        Err(format!(
            "Ensure this value is greater than or equal to {MIN_AMOUNT}."
        ))
    } else if value > MAX_AMOUNT {
        Err(format!("Ensure this value is less than or equal to {MAX_AMOUNT}."))
    } else {
        Ok(value)
    }
}

fn validate_ingredients(
    errors: &mut FieldErrors,
    ingredients: Option<Vec<IngredientAmountRequest>>,
) -> Vec<IngredientAmount> {
    let ingredients = match ingredients {
        Some(ingredients) if !ingredients.is_empty() => ingredients,
        Some(_) => {
            errors.add("ingredients", "At least one ingredient is required.");
            return Vec::new();
        }
        None => {
            errors.add("ingredients", REQUIRED);
            return Vec::new();
        }
    };
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(ingredients.len());
    for item in ingredients {
        let Some(id) = item.id else {
            errors.add("ingredients", "Each ingredient needs an id.");
            continue;
        };
        if !seen.insert(id) {
            errors.add("ingredients", format!("Ingredient {id} is listed more than once."));
            continue;
        }
        match item.amount.map(in_amount_range) {
            Some(Ok(amount)) => result.push(IngredientAmount { id, amount }),
            Some(Err(message)) => errors.add("amount", message),
            None => errors.add("amount", REQUIRED),
        }
    }
    result
}

fn validate_image(errors: &mut FieldErrors, image: String) -> Option<DecodedImage> {
    if image.is_empty() {
        errors.add("image", BLANK);
        return None;
    }
    match decode_data_uri(&image) {
        Ok(image) => Some(image),
        Err(message) => {
            errors.add("image", message);
            None
        }
    }
}

fn validate_cooking_time(errors: &mut FieldErrors, cooking_time: i64) -> i64 {
    in_amount_range(cooking_time).unwrap_or_else(|message| {
        errors.add("cooking_time", message);
        cooking_time
    })
}

impl CreateRecipeRequest {
    pub fn validate(self) -> Result<NewRecipe, RequestError> {
        let mut errors = FieldErrors::new();
        let ingredients = validate_ingredients(&mut errors, self.ingredients);
        let name = required_text(&mut errors, "name", self.name, MAX_RECIPE_NAME_LENGTH);
        let text = required_text(&mut errors, "text", self.text, usize::MAX);
        let image = match self.image {
            Some(image) => validate_image(&mut errors, image),
            None => {
                errors.add("image", REQUIRED);
                None
            }
        };
        let cooking_time = match self.cooking_time {
            Some(cooking_time) => validate_cooking_time(&mut errors, cooking_time),
            None => {
                errors.add("cooking_time", REQUIRED);
                0
            }
        };
        errors.into_result()?;
        let image = image.ok_or(RequestError::ServerError)?;
        Ok(NewRecipe {
            name,
            image,
            text,
            cooking_time,
            ingredients,
        })
    }
}

impl UpdateRecipeRequest {
    pub fn validate(self) -> Result<RecipeChanges, RequestError> {
        let mut errors = FieldErrors::new();
        let ingredients = validate_ingredients(&mut errors, self.ingredients);
        let name = self
            .name
            .map(|name| required_text(&mut errors, "name", Some(name), MAX_RECIPE_NAME_LENGTH));
        let text = self
            .text
            .map(|text| required_text(&mut errors, "text", Some(text), usize::MAX));
        let image = self
            .image
            .and_then(|image| validate_image(&mut errors, image));
        let cooking_time = self
            .cooking_time
            .map(|cooking_time| validate_cooking_time(&mut errors, cooking_time));
        errors.into_result()?;
        Ok(RecipeChanges {
            name,
            image,
            text,
            cooking_time,
            ingredients,
        })
    }
}

mod request;
mod response;
mod wrapper;

pub use request::*;
pub use response::*;
pub use wrapper::*;

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: i64 = 6;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        let limit = limit
            .map(i64::from)
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Page {
            limit,
            offset: offset.map(i64::from).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct PageQueryParams {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl PageQueryParams {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct SubscriptionQueryParams {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub recipes_limit: Option<u32>,
}

impl SubscriptionQueryParams {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct RecipesLimitParams {
    #[serde(default)]
    pub recipes_limit: Option<u32>,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct RecipeQueryParams {
    #[serde(default)]
    pub author: Option<i64>,
    #[serde(default)]
    pub is_favorited: Option<String>,
    #[serde(default)]
    pub is_in_shopping_cart: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Filters for the recipe list, already resolved against the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeFilters {
    pub author: Option<i64>,
    pub favorited_by: Option<i64>,
    pub in_cart_of: Option<i64>,
}

fn is_truthy(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("1") | Some("true") | Some("True"))
}

impl RecipeQueryParams {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }

    /// Favorite and cart filters only apply to an authenticated viewer.
    pub fn filters(&self, viewer: Option<i64>) -> RecipeFilters {
        RecipeFilters {
            author: self.author,
            favorited_by: viewer.filter(|_| is_truthy(&self.is_favorited)),
            in_cart_of: viewer.filter(|_| is_truthy(&self.is_in_shopping_cart)),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct IngredientQueryParams {
    #[serde(default)]
    pub name: Option<String>,
}

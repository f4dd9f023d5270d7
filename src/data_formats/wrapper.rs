use serde::{Deserialize, Serialize};

use crate::site::SiteUrl;

use super::Page;

/// Offset/limit page of results.
#[derive(Debug, Deserialize, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(results: Vec<T>, count: i64, page: Page, site: &SiteUrl) -> Self {
        let Page { limit, offset } = page;
        let next = (offset + limit < count).then(|| site.page_link(limit, offset + limit));
        let previous = (offset > 0).then(|| site.page_link(limit, (offset - limit).max(0)));
        Paginated {
            count,
            next,
            previous,
            results,
        }
    }
}

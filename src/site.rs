use std::convert::Infallible;

use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::{header, request::Parts};

/// Scheme, host and request target of the current request, used to build
/// absolute links (media URLs, pagination, short links).
#[derive(Debug, Clone)]
pub struct SiteUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SiteUrl
where
    S: Send + Sync + 'static,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let scheme = parts
            .headers
            .get("X-Forwarded-Proto")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("http")
            .to_string();
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());
        // Nested routers see a stripped path; links must use the one the client sent.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri.clone())
            .unwrap_or_else(|| parts.uri.clone());
        Ok(SiteUrl {
            scheme,
            host,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
        })
    }
}

impl SiteUrl {
    pub fn absolute(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }

    pub fn media(&self, relative: &str) -> String {
        self.absolute(&format!("/media/{relative}"))
    }

    /// Link to the current path with `limit`/`offset` replaced and other query parameters kept.
    pub fn page_link(&self, limit: i64, offset: i64) -> String {
        let mut params: Vec<String> = self
            .query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let key = pair.split('=').next().unwrap_or_default();
                key != "limit" && key != "offset"
            })
            .map(str::to_string)
            .collect();
        params.push(format!("limit={limit}"));
        if offset > 0 {
            params.push(format!("offset={offset}"));
        }
        format!("{}?{}", self.absolute(&self.path), params.join("&"))
    }
}

const SHORT_CODE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn encode_short_code(id: i64) -> String {
    let mut value = id.max(0) as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(SHORT_CODE_ALPHABET[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

pub fn decode_short_code(code: &str) -> Option<i64> {
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    i64::from_str_radix(&code.to_ascii_lowercase(), 36)
        .ok()
        .filter(|id| *id > 0)
}

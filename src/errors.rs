use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json,
};
use serde_json::{json, Value};

use crate::JsonResponse;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid input: {0:?}")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("internal server error")]
    ServerError,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key for messages that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-level validation messages, rendered as `{"field": ["message", ...]}`.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Turns collected messages into an error, or `Ok(())` when there are none.
    pub fn into_result(self) -> Result<(), RequestError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RequestError::Validation(self))
        }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> RequestError {
        let mut errors = Self::new();
        errors.add(field, message);
        RequestError::Validation(errors)
    }
}

impl RequestError {
    /// SQLite reports a violated UNIQUE index as `UNIQUE constraint failed: table.column`.
    pub fn unique_violation(&self) -> Option<String> {
        match self {
            RequestError::Database(sqlx::Error::Database(e))
                if e.message().contains("UNIQUE constraint failed") =>
            {
                Some(e.message().to_string())
            }
            _ => None,
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<Value> {
        let detail = |message: &str| json!({ "detail": message });
        let (status_code, body) = match self {
            RequestError::Validation(fields) => (StatusCode::BAD_REQUEST, json!(fields.0)),
            RequestError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "errors": message }))
            }
            RequestError::NotAuthorized(message) => (StatusCode::UNAUTHORIZED, detail(message)),
            RequestError::Forbidden => (
                StatusCode::FORBIDDEN,
                detail("You do not have permission to perform this action."),
            ),
            RequestError::NotFound(message) => (StatusCode::NOT_FOUND, detail(message)),
            RequestError::ServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("Internal Server Error"),
            ),
            RequestError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    detail("Internal Server Error"),
                )
            }
            RequestError::Io(e) => {
                tracing::error!(error = %e, "i/o error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    detail("Internal Server Error"),
                )
            }
        };
        (status_code, Json(body))
    }
}

/// Body rejections become 400s. Type errors from serde are keyed by the
/// offending field (`ingredients[0].amount` reports under `amount`).
impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        tracing::debug!(%text, "request body rejected");
        if !matches!(rejection, JsonRejection::JsonDataError(_)) {
            return FieldErrors::single(NON_FIELD_ERRORS, text);
        }
        let detail = text
            .split_once("target type: ")
            .map_or(text.as_str(), |(_, detail)| detail);
        match detail.split_once(": ") {
            Some((path, message)) if !path.contains(' ') => {
                let last = path.rsplit('.').next().unwrap_or(path);
                let field = last.split('[').next().unwrap_or(last);
                if field.is_empty() {
                    FieldErrors::single(NON_FIELD_ERRORS, detail)
                } else {
                    FieldErrors::single(field, message)
                }
            }
            _ => FieldErrors::single(NON_FIELD_ERRORS, detail),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn field_errors_render_as_lists_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("amount", "Ensure this value is greater than or equal to 1.");
        errors.add("amount", "second");
        errors.add("name", "This field may not be blank.");
        let (status, Json(body)) = RequestError::Validation(errors).to_json_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["amount"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(body["name"][0], "This field may not be blank.");
    }

    #[test]
    fn not_found_uses_detail() {
        let (status, Json(body)) = RequestError::NotFound("Recipe not found").to_json_response();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Recipe not found");
    }
}

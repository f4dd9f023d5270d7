use std::sync::Arc;

use axum::{
    extract::Path,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Redirect},
    Extension, Json,
};

use crate::{
    config::AppConfig,
    errors::RequestError,
    images::{content_type_for, resolve_media_path},
    site::decode_short_code,
};

mod ingredients;
mod recipes;
mod users;

pub use ingredients::*;
pub use recipes::*;
pub use users::*;

type JsonResult<T> = Result<Json<T>, RequestError>;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> Result<(), (StatusCode, String)> {
    Err((
        StatusCode::NOT_FOUND,
        format!("URL {} provided was not found", uri),
    ))
}

pub async fn serve_media(
    Extension(config): Extension<Arc<AppConfig>>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, RequestError> {
    let path = resolve_media_path(&config.media_root, path.trim_start_matches('/'))
        .ok_or(RequestError::NotFound("File not found."))?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RequestError::NotFound("File not found."))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes))
}

/// `/s/<code>` resolves to the frontend's recipe page.
pub async fn follow_short_link(Path(code): Path<String>) -> Result<Redirect, RequestError> {
    let id = decode_short_code(&code).ok_or(RequestError::NotFound("Link not found."))?;
    Ok(Redirect::temporary(&format!("/recipes/{id}")))
}

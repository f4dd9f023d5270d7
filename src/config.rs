use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};

const DEFAULT_MEDIA_ROOT: &str = "media";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";

/// Runtime settings, read once at start-up and shared with handlers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub media_root: PathBuf,
    pub bind_address: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let media_root = std::env::var("MEDIA_ROOT")
            .unwrap_or_else(|_| DEFAULT_MEDIA_ROOT.to_string())
            .into();
        let bind_address = std::env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string())
            .parse()
            .context("BIND_ADDRESS must be a socket address such as 127.0.0.1:3001")?;
        Ok(Self {
            database_url,
            jwt_secret,
            media_root,
            bind_address,
        })
    }
}

//! Seeds the ingredient table from a JSON array of
//! `{"name": ..., "measurement_unit": ...}` objects.
//!
//! Usage: `import-ingredients [path]` (defaults to `data/ingredients.json`).

use anyhow::{Context, Result};
use foodgram::{init_db, insert_ingredients_in_db};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_PATH: &str = "data/ingredients.json";

#[derive(Debug, Deserialize)]
struct IngredientRecord {
    name: String,
    measurement_unit: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    dotenvy::dotenv().ok();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PATH.to_string());
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {path}"))?;
    let records: Vec<IngredientRecord> =
        serde_json::from_str(&raw).with_context(|| format!("{path} is not a list of ingredients"))?;
    info!(path = %path, count = records.len(), "loaded ingredient file");

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = init_db(&db_url).await?;
    let rows: Vec<(String, String)> = records
        .into_iter()
        .filter(|record| !record.name.trim().is_empty())
        .map(|record| (record.name, record.measurement_unit))
        .collect();
    let inserted = insert_ingredients_in_db(&pool, &rows).await?;
    info!(inserted, skipped = rows.len() as u64 - inserted, "ingredients imported");
    Ok(())
}

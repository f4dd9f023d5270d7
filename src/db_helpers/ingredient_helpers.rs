use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::{errors::RequestError, models::Ingredient};

// Keeps each multi-row insert well under SQLite's bound-parameter limit.
const INSERT_CHUNK: usize = 500;

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive prefix search over ingredient names. Matching runs on
/// `search_name`, which holds the Unicode lowercase form of the name.
pub async fn search_ingredients_in_db(
    pool: &SqlitePool,
    prefix: Option<&str>,
) -> Result<Vec<Ingredient>, RequestError> {
    let prefix = prefix.unwrap_or_default().trim().to_lowercase();
    let pattern = format!("{}%", escape_like(&prefix));
    let result = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, name, measurement_unit FROM ingredients
        WHERE search_name LIKE $1 ESCAPE '\'
        ORDER BY name, id
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;
    Ok(result)
}

pub async fn get_ingredient_in_db(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<Ingredient>, RequestError> {
    let result = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(result)
}

/// Bulk insert used for seeding; rows already present are skipped. Returns the number inserted.
pub async fn insert_ingredients_in_db(
    pool: &SqlitePool,
    ingredients: &[(String, String)],
) -> Result<u64, RequestError> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for chunk in ingredients.chunks(INSERT_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new(
            "INSERT OR IGNORE INTO ingredients (name, measurement_unit, search_name) ",
        );
        query.push_values(chunk, |mut row, (name, unit)| {
            let name = name.trim();
            row.push_bind(name)
                .push_bind(unit.trim())
                .push_bind(name.to_lowercase());
        });
        inserted += query.build().execute(&mut tx).await?.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}

/// Returns the ids from `ids` that do not name an existing ingredient.
pub(super) async fn missing_ingredient_ids(
    tx: &mut Transaction<'_, Sqlite>,
    ids: &[i64],
) -> Result<Vec<i64>, RequestError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM ingredients WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    let found: Vec<(i64,)> = query.build_query_as().fetch_all(&mut *tx).await?;
    Ok(ids
        .iter()
        .copied()
        .filter(|id| !found.iter().any(|(found_id,)| found_id == id))
        .collect())
}

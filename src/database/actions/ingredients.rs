use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, ApiResult},
    schema::{Id, Ingredient},
};

/// Unpaginated listing with optional case-insensitive prefix search.
pub async fn list_ingredients(
    name_prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> ApiResult<Vec<Ingredient>> {
    let rows: Vec<Ingredient> = match name_prefix {
        Some(prefix) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 || '%' ORDER BY name")
                .bind(prefix)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> ApiResult<Ingredient> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| ApiError::not_found("no ingredient exists with the specified id"))
}

/// Inserts an ingredient unless the (name, unit) pair already exists.
/// Returns the id of the new row, or None when it was a duplicate.
pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> ApiResult<Option<Id>> {
    let row: Option<(Id,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        RETURNING id
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.0))
}

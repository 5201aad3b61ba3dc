use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, ApiResult},
    schema::{Id, Tag},
};

pub async fn list_tags(pool: &Pool<Postgres>) -> ApiResult<Vec<Tag>> {
    let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY slug")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> ApiResult<Tag> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| ApiError::not_found("no tag exists with the specified id"))
}

/// Name, color and slug are each globally unique; a duplicate surfaces
/// as a Conflict through the constraints.
pub async fn create_tag(name: &str, color: &str, slug: &str, pool: &Pool<Postgres>) -> ApiResult<Id> {
    let id: (Id,) = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(color)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(id.0)
}

use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, ApiResult},
    schema::Id,
};

pub async fn is_favorite(recipe_id: Id, user_id: Id, pool: &Pool<Postgres>) -> ApiResult<bool> {
    let row: Option<(Id,)> = sqlx::query_as(
        "SELECT recipe_id FROM favorite_recipes WHERE recipe_id = $1 AND user_id = $2",
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

pub async fn add_to_favorites(recipe_id: Id, user_id: Id, pool: &Pool<Postgres>) -> ApiResult<()> {
    let result = sqlx::query(
        "INSERT INTO favorite_recipes (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    super::toggled(
        result.rows_affected(),
        ApiError::conflict("recipe is already in favorites"),
    )
}

pub async fn remove_from_favorites(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM favorite_recipes WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    super::toggled(
        result.rows_affected(),
        ApiError::not_found("recipe is not in favorites"),
    )
}

use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, ApiResult},
    pagination::{PageContext, Pagination},
    schema::{Id, ShortRecipe, Subscription, UserProfile, UserProfileRow},
};

use super::users;

/// Subscribes `user_id` to `author_id`. Self-follows are rejected in
/// application logic; duplicates surface through the unique constraint.
pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> ApiResult<()> {
    if user_id == author_id {
        return Err(ApiError::conflict("you cannot subscribe to yourself"));
    }

    if users::get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::not_found("no user exists with the specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    super::toggled(
        result.rows_affected(),
        ApiError::conflict("you are already subscribed to this author"),
    )
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    super::toggled(
        result.rows_affected(),
        ApiError::not_found("you are not subscribed to this author"),
    )
}

async fn author_recipes(
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> ApiResult<(Vec<ShortRecipe>, i64)> {
    let recipes: Vec<ShortRecipe> = match recipes_limit {
        Some(limit) => {
            sqlx::query_as(
                "
                SELECT id, name, image, cooking_time FROM recipes
                WHERE author_id = $1 ORDER BY pub_date DESC LIMIT $2
            ",
            )
            .bind(author_id)
            .bind(limit.max(0))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "
                SELECT id, name, image, cooking_time FROM recipes
                WHERE author_id = $1 ORDER BY pub_date DESC
            ",
            )
            .bind(author_id)
            .fetch_all(pool)
            .await?
        }
    };

    let (recipes_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(pool)
            .await?;

    Ok((recipes, recipes_count))
}

/// Single subscription entry for an author, as answered after a
/// successful subscribe.
pub async fn get_subscription(
    author_id: Id,
    viewer: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> ApiResult<Subscription> {
    let author = users::get_profile(author_id, Some(viewer), pool).await?;
    let (recipes, recipes_count) = author_recipes(author_id, recipes_limit, pool).await?;

    Ok(Subscription {
        author,
        recipes,
        recipes_count,
    })
}

/// Page of authors the user follows, each embedding their recipes
/// (optionally truncated) and the full recipe count.
pub async fn fetch_subscriptions(
    user_id: Id,
    page: Pagination,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> ApiResult<PageContext<Subscription>> {
    let limit = page.limit();
    let offset = page.offset();

    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            TRUE AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total_rows = rows.first().map(|r| r.count).unwrap_or(0);

    let mut subscriptions = Vec::with_capacity(rows.len());
    for row in rows {
        let author = UserProfile::from(row);
        let (recipes, recipes_count) = author_recipes(author.id, recipes_limit, pool).await?;
        subscriptions.push(Subscription {
            author,
            recipes,
            recipes_count,
        });
    }

    Ok(PageContext::from_rows(
        subscriptions,
        total_rows,
        limit,
        offset,
    ))
}

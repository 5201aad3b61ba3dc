use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionKey},
    },
    error::{ApiError, ApiResult},
    pagination::PageContext,
    schema::{Id, RegisterInput, User, UserProfile, UserProfileRow},
};

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> ApiResult<Option<User>> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_email(pool: &Pool<Postgres>, email: &str) -> ApiResult<Option<User>> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub fn validate_registration(input: &RegisterInput) -> ApiResult<()> {
    if input.email.is_empty() || !input.email.contains('@') {
        return Err(ApiError::validation("a valid email is required"));
    }
    if input.username.is_empty() {
        return Err(ApiError::validation("username must not be empty"));
    }
    if input.password.len() < 8 {
        return Err(ApiError::validation(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

/// Registers a new user. Duplicate email or username surfaces as a
/// Conflict through the unique constraints.
pub async fn register_user(input: &RegisterInput, pool: &Pool<Postgres>) -> ApiResult<Id> {
    validate_registration(input)?;

    let password = hash_password(&input.password)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(&input.email)
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(password)
    .fetch_one(pool)
    .await?;

    Ok(id.0)
}

/// Checks credentials and returns a signed session token.
pub async fn login_user(
    email: &str,
    password: &str,
    key: &SessionKey,
    pool: &Pool<Postgres>,
) -> ApiResult<String> {
    let user = get_user_by_email(pool, email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    if !verify_password(password, &user.password)? {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    generate_jwt_session(&user, key)
}

/// Profile of a single user, with the follow flag relative to the viewer.
/// A NULL viewer never matches the EXISTS probe, so anonymous requests
/// read `is_subscribed = false`.
pub async fn get_profile(
    user_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> ApiResult<UserProfile> {
    let row: Option<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(
                SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.author_id = u.id
            ) AS is_subscribed,
            0::BIGINT AS count
        FROM users u
        WHERE u.id = $2
    ",
    )
    .bind(viewer)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(UserProfile::from)
        .ok_or_else(|| ApiError::not_found("no user exists with the specified id"))
}

pub async fn fetch_users(
    viewer: Option<Id>,
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> ApiResult<PageContext<UserProfile>> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(
                SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.author_id = u.id
            ) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total_rows = rows.first().map(|r| r.count).unwrap_or(0);
    let profiles = rows.into_iter().map(UserProfile::from).collect();

    Ok(PageContext::from_rows(profiles, total_rows, limit, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RegisterInput {
        RegisterInput {
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[test]
    fn registration_accepts_a_complete_input() {
        assert!(validate_registration(&input()).is_ok());
    }

    #[test]
    fn registration_rejects_bad_email_and_short_password() {
        let mut bad_email = input();
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(
            validate_registration(&bad_email),
            Err(ApiError::Validation(_))
        ));

        let mut short = input();
        short.password = "short".to_string();
        assert!(matches!(
            validate_registration(&short),
            Err(ApiError::Validation(_))
        ));
    }
}

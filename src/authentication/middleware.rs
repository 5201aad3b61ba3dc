use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::constants::SESSION_COOKIE;
use crate::error::ApiError;

use super::jwt::{verify_jwt_session, SessionData, SessionKey};

/// Requires a valid session cookie; anonymous requests are rejected.
pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |cookie: Option<String>| {
        let key = key.clone();
        async move {
            match cookie {
                Some(token) => verify_jwt_session(&token, &key).map_err(ApiError::reject),
                None => {
                    Err(ApiError::Unauthorized("authentication required".to_string()).reject())
                }
            }
        }
    })
}

/// Resolves the session when present; invalid or missing cookies fall
/// back to an anonymous request instead of rejecting.
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |cookie: Option<String>| {
        cookie.and_then(|token| verify_jwt_session(&token, &key).ok())
    })
}

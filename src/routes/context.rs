use std::convert::Infallible;
use std::path::PathBuf;

use sqlx::{Pool, Postgres};
use warp::{reject::Rejection, Filter};

use crate::authentication::jwt::SessionKey;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub pool: Pool<Postgres>,
    pub session_key: SessionKey,
    pub media_root: PathBuf,
}

pub fn with_context(
    ctx: AppContext,
) -> impl Filter<Extract = (AppContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// The raw query string, or empty when the request has none.
pub fn raw_query() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::query::raw().or_else(|_| async { Ok::<(String,), Rejection>((String::new(),)) })
}

use warp::{reject::Rejection, reply::Reply, Filter};

use crate::{actions::tags, error::ApiError, schema::Id};

use super::context::{with_context, AppContext};

pub fn routes(ctx: &AppContext) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(list_tags);

    let detail = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(get_tag);

    list.or(detail)
}

async fn list_tags(ctx: AppContext) -> Result<impl Reply, Rejection> {
    let rows = tags::list_tags(&ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&rows))
}

async fn get_tag(id: Id, ctx: AppContext) -> Result<impl Reply, Rejection> {
    let tag = tags::get_tag(id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&tag))
}

use warp::{reject::Rejection, reply::Reply, Filter};

use crate::{
    actions::ingredients,
    error::ApiError,
    filter::IngredientQuery,
    schema::Id,
};

use super::context::{with_context, AppContext};

pub fn routes(ctx: &AppContext) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and(warp::query::<IngredientQuery>())
        .and_then(list_ingredients);

    let detail = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(get_ingredient);

    list.or(detail)
}

async fn list_ingredients(ctx: AppContext, query: IngredientQuery) -> Result<impl Reply, Rejection> {
    let rows = ingredients::list_ingredients(query.name.as_deref(), &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&rows))
}

async fn get_ingredient(id: Id, ctx: AppContext) -> Result<impl Reply, Rejection> {
    let ingredient = ingredients::get_ingredient(id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&ingredient))
}

use warp::{
    http::{header, StatusCode},
    reject::Rejection,
    reply::Reply,
    Filter,
};

use crate::{
    actions::{cart, favorites, recipes, users},
    error::ApiError,
    filter::RecipeListQuery,
    jwt::SessionData,
    media,
    middleware::{with_possible_session, with_session},
    schema::{Id, RecipeInput},
};

use super::context::{raw_query, with_context, AppContext};

pub fn routes(ctx: &AppContext) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and(with_possible_session(ctx.session_key.clone()))
        .and(raw_query())
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and(warp::body::json())
        .and_then(create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and_then(download_shopping_cart);

    let detail = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and(with_possible_session(ctx.session_key.clone()))
        .and_then(get_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and(warp::body::json())
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and_then(delete_recipe);

    let favorite_add = warp::path!("recipes" / Id / "favorite")
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and_then(add_favorite);

    let favorite_remove = warp::path!("recipes" / Id / "favorite")
        .and(warp::delete())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and_then(remove_favorite);

    let cart_add = warp::path!("recipes" / Id / "shopping_cart")
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and_then(add_to_cart);

    let cart_remove = warp::path!("recipes" / Id / "shopping_cart")
        .and(warp::delete())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and_then(remove_from_cart);

    download
        .or(list)
        .or(create)
        .or(detail)
        .or(update)
        .or(delete)
        .or(favorite_add)
        .or(favorite_remove)
        .or(cart_add)
        .or(cart_remove)
}

async fn list_recipes(
    ctx: AppContext,
    session: Option<SessionData>,
    query: String,
) -> Result<impl Reply, Rejection> {
    let query = RecipeListQuery::parse(&query);
    let viewer = session.map(|s| s.user_id);

    let page = recipes::fetch_recipe_page(&query, viewer, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&page))
}

async fn get_recipe(
    id: Id,
    ctx: AppContext,
    session: Option<SessionData>,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let detail = recipes::get_recipe_detail(id, viewer, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&detail))
}

async fn create_recipe(
    ctx: AppContext,
    session: SessionData,
    input: RecipeInput,
) -> Result<impl Reply, Rejection> {
    recipes::validate_recipe_input(&input).map_err(ApiError::reject)?;

    let image = input
        .image
        .as_deref()
        .ok_or_else(|| ApiError::validation("image is required").reject())?;
    let stored = media::save_image(&ctx.media_root, image).map_err(ApiError::reject)?;

    // A failed transaction must not leave the written image behind.
    let id = match recipes::create_recipe(session.user_id, &input, stored.clone(), &ctx.pool).await
    {
        Ok(id) => id,
        Err(e) => {
            media::remove_image(&ctx.media_root, &stored);
            return Err(e.reject());
        }
    };

    let detail = recipes::get_recipe_detail(id, Some(session.user_id), &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&detail),
        StatusCode::CREATED,
    ))
}

async fn update_recipe(
    id: Id,
    ctx: AppContext,
    session: SessionData,
    input: RecipeInput,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe_owned(id, session.user_id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;
    recipes::validate_recipe_input(&input).map_err(ApiError::reject)?;

    let image = match input.image.as_deref() {
        Some(data) => Some(media::save_image(&ctx.media_root, data).map_err(ApiError::reject)?),
        None => None,
    };

    if let Err(e) = recipes::update_recipe(&recipe, &input, image.clone(), &ctx.pool).await {
        // Roll the new image back along with the transaction.
        if let Some(name) = &image {
            media::remove_image(&ctx.media_root, name);
        }
        return Err(e.reject());
    }

    if image.is_some() {
        media::remove_image(&ctx.media_root, &recipe.image);
    }

    let detail = recipes::get_recipe_detail(id, Some(session.user_id), &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&detail))
}

async fn delete_recipe(
    id: Id,
    ctx: AppContext,
    session: SessionData,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe_owned(id, session.user_id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;
    recipes::delete_recipe(id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;
    media::remove_image(&ctx.media_root, &recipe.image);

    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

async fn add_favorite(
    id: Id,
    ctx: AppContext,
    session: SessionData,
) -> Result<impl Reply, Rejection> {
    let short = recipes::get_short_recipe(id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;
    favorites::add_to_favorites(id, session.user_id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&short),
        StatusCode::CREATED,
    ))
}

async fn remove_favorite(
    id: Id,
    ctx: AppContext,
    session: SessionData,
) -> Result<impl Reply, Rejection> {
    recipes::get_short_recipe(id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;
    favorites::remove_from_favorites(id, session.user_id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

async fn add_to_cart(
    id: Id,
    ctx: AppContext,
    session: SessionData,
) -> Result<impl Reply, Rejection> {
    let short = recipes::get_short_recipe(id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;
    cart::add_to_cart(id, session.user_id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&short),
        StatusCode::CREATED,
    ))
}

async fn remove_from_cart(
    id: Id,
    ctx: AppContext,
    session: SessionData,
) -> Result<impl Reply, Rejection> {
    recipes::get_short_recipe(id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;
    cart::remove_from_cart(id, session.user_id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

async fn download_shopping_cart(
    ctx: AppContext,
    session: SessionData,
) -> Result<impl Reply, Rejection> {
    let user = users::get_user_by_id(&ctx.pool, session.user_id)
        .await
        .map_err(ApiError::reject)?
        .ok_or_else(|| ApiError::not_found("no user exists with the specified id").reject())?;

    let document = cart::build_shopping_list(&user, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    let filename = format!("{}_shopping_list.txt", user.username);
    let reply = warp::reply::with_header(
        document,
        header::CONTENT_TYPE,
        "text/plain; charset=utf-8",
    );
    let reply = warp::reply::with_header(
        reply,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename={filename}"),
    );

    Ok(reply)
}

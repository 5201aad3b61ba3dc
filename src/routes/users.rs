use warp::{
    http::{header, StatusCode},
    reject::Rejection,
    reply::Reply,
    Filter,
};

use crate::{
    actions::{follows, users},
    constants::{SESSION_COOKIE, SESSION_LIFETIME_HOURS},
    error::ApiError,
    filter::SubscriptionsQuery,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::Pagination,
    schema::{Id, LoginInput, RegisterInput},
};

use super::context::{with_context, AppContext};

pub fn routes(ctx: &AppContext) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let register = warp::path!("users")
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and(warp::body::json())
        .and_then(register);

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and(with_possible_session(ctx.session_key.clone()))
        .and(warp::query::<Pagination>())
        .and_then(list_users);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and_then(me);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and(warp::query::<SubscriptionsQuery>())
        .and_then(list_subscriptions);

    let detail = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and(with_possible_session(ctx.session_key.clone()))
        .and_then(get_user);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and(warp::query::<SubscriptionsQuery>())
        .and_then(subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_context(ctx.clone()))
        .and(with_session(ctx.session_key.clone()))
        .and_then(unsubscribe);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and(warp::body::json())
        .and_then(login);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and_then(logout);

    register
        .or(me)
        .or(subscriptions)
        .or(list)
        .or(detail)
        .or(subscribe)
        .or(unsubscribe)
        .or(login)
        .or(logout)
}

async fn register(ctx: AppContext, input: RegisterInput) -> Result<impl Reply, Rejection> {
    let id = users::register_user(&input, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    let profile = users::get_profile(id, None, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&profile),
        StatusCode::CREATED,
    ))
}

async fn login(ctx: AppContext, input: LoginInput) -> Result<impl Reply, Rejection> {
    let token = users::login_user(&input.email, &input.password, &ctx.session_key, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    let body = warp::reply::json(&serde_json::json!({ "auth_token": token }));
    let cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; Max-Age={}",
        SESSION_LIFETIME_HOURS * 3600
    );

    Ok(warp::reply::with_header(body, header::SET_COOKIE, cookie))
}

async fn logout() -> Result<impl Reply, Rejection> {
    let reply = warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT);
    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; Max-Age=0");

    Ok(warp::reply::with_header(reply, header::SET_COOKIE, cookie))
}

async fn list_users(
    ctx: AppContext,
    session: Option<SessionData>,
    page: Pagination,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let page = users::fetch_users(viewer, page.limit(), page.offset(), &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&page))
}

async fn me(ctx: AppContext, session: SessionData) -> Result<impl Reply, Rejection> {
    let profile = users::get_profile(session.user_id, Some(session.user_id), &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&profile))
}

async fn get_user(
    id: Id,
    ctx: AppContext,
    session: Option<SessionData>,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let profile = users::get_profile(id, viewer, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&profile))
}

async fn list_subscriptions(
    ctx: AppContext,
    session: SessionData,
    query: SubscriptionsQuery,
) -> Result<impl Reply, Rejection> {
    let page = follows::fetch_subscriptions(
        session.user_id,
        query.page(),
        query.recipes_limit,
        &ctx.pool,
    )
    .await
    .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&page))
}

async fn subscribe(
    id: Id,
    ctx: AppContext,
    session: SessionData,
    query: SubscriptionsQuery,
) -> Result<impl Reply, Rejection> {
    follows::subscribe(session.user_id, id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    let subscription =
        follows::get_subscription(id, session.user_id, query.recipes_limit, &ctx.pool)
            .await
            .map_err(ApiError::reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&subscription),
        StatusCode::CREATED,
    ))
}

async fn unsubscribe(id: Id, ctx: AppContext, session: SessionData) -> Result<impl Reply, Rejection> {
    follows::unsubscribe(session.user_id, id, &ctx.pool)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

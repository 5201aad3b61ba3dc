use std::error::Error;

use sqlx::postgres::PgPoolOptions;
use warp::Filter;

use foodgram_backend::{
    context::AppContext, error::handle_rejection, ingredients, jwt::SessionKey, recipes, tags,
    users, Config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = Config::load();

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let ctx = AppContext {
        pool,
        session_key: SessionKey::new(config.session_secret.as_bytes()),
        media_root: config.media_root.clone(),
    };

    let api = warp::path("api").and(
        recipes::routes(&ctx)
            .or(users::routes(&ctx))
            .or(ingredients::routes(&ctx))
            .or(tags::routes(&ctx)),
    );

    let media_files = warp::path("media").and(warp::fs::dir(config.media_root.clone()));

    let routes = api
        .or(media_files)
        .recover(handle_rejection)
        .with(warp::log("foodgram"));

    log::info!("listening on {}", config.bind_addr);
    warp::serve(routes).run(config.bind_addr).await;

    Ok(())
}

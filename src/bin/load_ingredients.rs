//! Seeds the ingredients table from a JSON file of
//! `{"name": ..., "measurement_unit": ...}` objects.

use std::{env, error::Error, fs};

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;

use foodgram_backend::{actions::ingredients, Config};

#[derive(Deserialize)]
struct IngredientSeed {
    name: String,
    measurement_unit: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "data/ingredients.json".to_string());

    let config = Config::load();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let data = fs::read_to_string(&path)?;
    let seeds: Vec<IngredientSeed> = serde_json::from_str(&data)?;

    let mut inserted = 0;
    let mut skipped = 0;
    for seed in &seeds {
        match ingredients::create_ingredient(&seed.name, &seed.measurement_unit, &pool).await? {
            Some(_) => inserted += 1,
            None => skipped += 1,
        }
    }

    log::info!("loaded {path}: {inserted} ingredients inserted, {skipped} duplicates skipped");

    Ok(())
}

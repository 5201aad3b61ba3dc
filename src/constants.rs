pub const DEFAULT_PAGE_SIZE: i64 = 6;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_LIFETIME_HOURS: i64 = 1;

/// Recipe images land under `<media root>/RECIPE_IMAGE_DIR/`.
pub const RECIPE_IMAGE_DIR: &str = "recipes";

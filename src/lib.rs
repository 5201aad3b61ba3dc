mod database {
    pub mod actions;
    pub mod error;
    pub mod filter;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
mod routes {
    pub mod context;
    pub mod ingredients;
    pub mod recipes;
    pub mod tags;
    pub mod users;
}
mod config;
mod constants;
mod media;

pub use authentication::*;
pub use config::Config;
pub use constants::*;
pub use database::*;
pub use media::*;
pub use routes::*;

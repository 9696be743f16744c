mod cache;
mod client;
pub mod models;

pub use client::RawgClient;
pub use models::{GameList, RawgGame, RawgGameDetail, RawgPageResponse};

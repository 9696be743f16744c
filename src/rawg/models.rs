//! Wire models for the RAWG game-data API.

use serde::{Deserialize, Serialize};

use crate::content::Game;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawgGenre {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawgPlatform {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawgPlatformWrapper {
    pub platform: RawgPlatform,
}

/// One result entry of the RAWG games listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawgGame {
    pub id: i64,
    pub name: String,
    pub released: Option<String>,
    pub background_image: Option<String>,
    #[serde(default)]
    pub genres: Vec<RawgGenre>,
    #[serde(default)]
    pub platforms: Vec<RawgPlatformWrapper>,
}

/// Raw RAWG listing page as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawgPageResponse {
    pub next: Option<String>,
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<RawgGame>,
}

/// RAWG game detail, passed through to clients mostly as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawgGameDetail {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub released: Option<String>,
    pub background_image: Option<String>,
    #[serde(default)]
    pub genres: Vec<RawgGenre>,
    #[serde(default)]
    pub platforms: Vec<RawgPlatformWrapper>,
}

/// A RAWG listing page with results mapped to the local game shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameList {
    pub next: Option<String>,
    pub previous: Option<String>,
    pub games: Vec<Game>,
}

impl From<RawgPageResponse> for GameList {
    fn from(response: RawgPageResponse) -> Self {
        GameList {
            next: response.next,
            previous: response.previous,
            games: response.results.into_iter().map(Game::from).collect(),
        }
    }
}

impl From<RawgGame> for Game {
    fn from(game: RawgGame) -> Self {
        Game {
            id: game.id.to_string(),
            title: game.name,
            genres: game.genres.into_iter().map(|g| g.name).collect(),
            release_date: game.released,
            platforms: game.platforms.into_iter().map(|w| w.platform.name).collect(),
            description: None,
            cover_image_url: game.background_image,
        }
    }
}

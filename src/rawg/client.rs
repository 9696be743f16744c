//! Read-through cached client for the RAWG game-data API.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

use crate::server::metrics::record_rawg_cache_lookup;

use super::cache::TtlCache;
use super::models::{GameList, RawgGameDetail, RawgPageResponse};

const DEFAULT_PAGE_SIZE: usize = 40;

/// Cache key for the listing endpoint: the query parameters that change the
/// response. Cached pages must never feed ownership decisions, they are
/// display data only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ListKey {
    page: Option<String>,
    search: Option<String>,
}

pub struct RawgClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    list_cache: TtlCache<ListKey, GameList>,
    detail_cache: TtlCache<String, RawgGameDetail>,
}

impl RawgClient {
    /// # Arguments
    /// * `base_url` - Base URL of the RAWG API (overridable for tests)
    /// * `api_key` - RAWG API key, appended to every request
    /// * `timeout_sec` - Request timeout in seconds
    /// * `cache_max_age_sec` - How long cached responses stay fresh
    pub fn new(
        base_url: String,
        api_key: String,
        timeout_sec: u64,
        cache_max_age_sec: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let max_age = Duration::from_secs(cache_max_age_sec);

        Ok(Self {
            client,
            base_url,
            api_key,
            list_cache: TtlCache::new(max_age),
            detail_cache: TtlCache::new(max_age),
        })
    }

    /// Fetches a page of the RAWG games listing, serving repeated queries
    /// from the cache until they expire.
    pub async fn load_games(
        &self,
        page: Option<String>,
        search: Option<String>,
    ) -> Result<GameList> {
        let key = ListKey {
            page: page.clone(),
            search: search.clone(),
        };
        if let Some(cached) = self.list_cache.get(&key).await {
            record_rawg_cache_lookup("list", true);
            debug!("rawg list cache hit (page={:?}, search={:?})", page, search);
            return Ok(cached);
        }
        record_rawg_cache_lookup("list", false);

        let mut url = format!(
            "{}/api/games?page_size={}&key={}",
            self.base_url, DEFAULT_PAGE_SIZE, self.api_key
        );
        if let Some(page) = &page {
            url.push_str(&format!("&page={}", page));
        }
        if let Some(search) = &search {
            url.push_str(&format!("&search={}", search));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach the RAWG API")?;

        if !response.status().is_success() {
            anyhow::bail!("RAWG listing request failed: status {}", response.status());
        }

        let page_response: RawgPageResponse = response
            .json()
            .await
            .context("Failed to parse RAWG listing response")?;

        let list: GameList = page_response.into();
        self.list_cache.insert(key, list.clone()).await;
        Ok(list)
    }

    /// Fetches the RAWG detail record of a single game, cached by id.
    pub async fn load_game_detail(&self, game_id: &str) -> Result<RawgGameDetail> {
        let key = game_id.to_string();
        if let Some(cached) = self.detail_cache.get(&key).await {
            record_rawg_cache_lookup("detail", true);
            debug!("rawg detail cache hit ({})", game_id);
            return Ok(cached);
        }
        record_rawg_cache_lookup("detail", false);

        let url = format!(
            "{}/api/games/{}?key={}",
            self.base_url, game_id, self.api_key
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach the RAWG API")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "RAWG detail request for {} failed: status {}",
                game_id,
                response.status()
            );
        }

        let detail: RawgGameDetail = response
            .json()
            .await
            .context("Failed to parse RAWG detail response")?;

        self.detail_cache.insert(key, detail.clone()).await;
        Ok(detail)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

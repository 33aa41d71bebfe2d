//! Inventory endpoint URL construction.

use url::Url;

use crate::error::Result;
use crate::models::{GroupId, ScraperConfig};

/// Builds request URLs for the inventory API.
#[derive(Debug, Clone)]
pub struct Endpoints {
    inventory: Url,
    image: Url,
    game_id: u32,
    min_price: f64,
    max_price: f64,
}

impl Endpoints {
    pub fn new(api_base: &str, game_id: u32, min_price: f64, max_price: f64) -> Result<Self> {
        let base = api_base.trim_end_matches('/');
        Ok(Self {
            inventory: Url::parse(&format!("{base}/inventory/data"))?,
            image: Url::parse(&format!("{base}/inventory/csgo-full-img"))?,
            game_id,
            min_price,
            max_price,
        })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        Self::new(
            &config.api_base,
            config.game_id,
            config.min_price,
            config.max_price,
        )
    }

    /// One page of the top-level listing.
    pub fn listing_page(&self, offset: u64, limit: u32) -> Url {
        self.inventory_query(offset, limit, None)
    }

    /// Every item of one listing group.
    pub fn group_items(&self, group: &GroupId, limit: u32) -> Url {
        self.inventory_query(0, limit, Some(group))
    }

    /// Full-size image lookup for one item.
    pub fn item_image(&self, item_id: &str) -> Url {
        let mut url = self.image.clone();
        url.query_pairs_mut().append_pair("assetId", item_id);
        url
    }

    fn inventory_query(&self, offset: u64, limit: u32, group: Option<&GroupId>) -> Url {
        let mut url = self.inventory.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("gameId", &self.game_id.to_string())
                .append_pair("offset", &offset.to_string())
                .append_pair("limit", &limit.to_string())
                .append_pair("sortType", "Price - high")
                .append_pair("searchValue", "")
                .append_pair("minPrice", &self.min_price.to_string())
                .append_pair("maxPrice", &self.max_price.to_string())
                .append_pair("minFloat", "0")
                .append_pair("maxFloat", "1")
                .append_pair("sticker", "true")
                .append_pair("showTradeLock", "true")
                .append_pair("onlyTradeLock", "true")
                .append_pair("colors", "")
                .append_pair("showUserListing", "true")
                .append_pair("stickerName", "")
                .append_pair("tradeLockDays[]", "7")
                .append_pair("tradeLockDays[]", "8")
                .append_pair("context", "trade")
                .append_pair("fresh", "true");
            if let Some(group) = group {
                q.append_pair("groupId", group.as_str());
            }
            q.append_pair("isForStore", "0");
        }
        url
    }
}

/// First value of a query parameter.
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

use eyre::{eyre, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::PriceConfig;

const FALLBACK_TOKEN_PRICE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceData {
    pub usd: f64,
    #[serde(default)]
    pub usd_24h_change: f64,
    #[serde(default)]
    pub usd_market_cap: f64,
    #[serde(default)]
    pub usd_24h_vol: f64,
}

impl PriceData {
    /// Static AVAX snapshot served whenever the live lookup fails.
    pub fn snapshot() -> Self {
        Self {
            usd: 28.45,
            usd_24h_change: 2.34,
            usd_market_cap: 11_234_567_890.0,
            usd_24h_vol: 345_678_901.0,
        }
    }
}

pub struct PriceService {
    client: Client,
    api_url: String,
    native_id: String,
    fallback: PriceData,
}

impl PriceService {
    pub fn new(config: &PriceConfig, native_id: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            native_id: native_id.to_string(),
            fallback: config.fallback,
        })
    }

    /// Live AVAX market data, or the fallback snapshot. Never fails.
    pub async fn get_avax_price(&self) -> PriceData {
        match self.get_live_avax_price().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Price lookup failed, using fallback snapshot: {}", e);
                self.get_fallback_avax_price()
            }
        }
    }

    /// Live AVAX market data only.
    pub async fn get_live_avax_price(&self) -> Result<PriceData> {
        self.fetch(&self.native_id).await
    }

    pub fn get_fallback_avax_price(&self) -> PriceData {
        self.fallback
    }

    /// USD price per id, one request each. Failed lookups price at 1.0.
    pub async fn get_token_prices(&self, ids: &[String]) -> HashMap<String, f64> {
        let mut prices = HashMap::new();
        for id in ids {
            let price = match self.fetch(id).await {
                Ok(data) => data.usd,
                Err(e) => {
                    warn!("Error fetching price for {}: {}", id, e);
                    FALLBACK_TOKEN_PRICE
                }
            };
            prices.insert(id.clone(), price);
        }
        prices
    }

    async fn fetch(&self, id: &str) -> Result<PriceData> {
        let url = Url::parse_with_params(
            &format!("{}/simple/price", self.api_url),
            &[
                ("ids", id),
                ("vs_currencies", "usd"),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ],
        )?;
        debug!("Fetching price: {}", url);

        let response: HashMap<String, PriceData> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_entry(response, id)
    }
}

fn parse_entry(mut response: HashMap<String, PriceData>, id: &str) -> Result<PriceData> {
    response
        .remove(id)
        .ok_or_else(|| eyre!("no price returned for {}", id))
}

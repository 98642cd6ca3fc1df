use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::price::QuoteFetcher;
use crate::core::table::AssetQuote;

// Asset id -> currency code -> price. A null price is kept as `None`.
type SimplePriceResponse = HashMap<String, BTreeMap<String, Option<f64>>>;

// CoinGeckoProvider implementation for QuoteFetcher
pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("crypto-etl/1.0")
            .timeout(timeout)
            .build()?;
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn simple_price_url(&self, assets: &[String], currencies: &[String]) -> Result<Url> {
        let ids = assets.join(",");
        let vs_currencies = currencies
            .iter()
            .map(|c| c.to_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        Url::parse_with_params(
            &format!("{}/simple/price", self.base_url),
            &[("ids", ids), ("vs_currencies", vs_currencies)],
        )
        .with_context(|| format!("Invalid provider base URL: {}", self.base_url))
    }
}

#[async_trait]
impl QuoteFetcher for CoinGeckoProvider {
    #[instrument(
        name = "CoinGeckoFetch",
        skip(self, assets, currencies),
        fields(assets = assets.len())
    )]
    async fn fetch_quotes(
        &self,
        assets: &[String],
        currencies: &[String],
    ) -> Result<Vec<AssetQuote>> {
        let url = self.simple_price_url(assets, currencies)?;
        debug!("Requesting prices from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} URL: {}", response.status(), url));
        }

        let text = response.text().await?;
        let mut data: SimplePriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;
        debug!(returned = data.len(), "Received price response");

        let quotes = assets
            .iter()
            .filter_map(|asset| {
                data.remove(asset).map(|prices| AssetQuote {
                    asset: asset.clone(),
                    prices: prices
                        .into_iter()
                        .map(|(code, price)| (code.to_lowercase(), price))
                        .collect(),
                })
            })
            .collect();
        Ok(quotes)
    }
}

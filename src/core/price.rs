//! Pricing abstractions

use crate::core::table::AssetQuote;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Fetches the latest price of every asset in every currency with a single
    /// request. Assets the service does not know are left out of the result.
    async fn fetch_quotes(&self, assets: &[String], currencies: &[String])
    -> Result<Vec<AssetQuote>>;
}

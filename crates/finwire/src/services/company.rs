use finwire_core::{ClientError, QueryParams};

use crate::api::{fetch, fetch_first, symbol_path, JsonApi};
use crate::types::{CompanyProfile, KeyExecutive, MarketCap};

/// Company profile and ownership facts.
pub struct CompanyService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> CompanyService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn profile(&self, symbol: &str) -> Result<CompanyProfile, ClientError> {
        let endpoint = format!("profile/{}", symbol_path(symbol)?);
        fetch_first(self.api, &endpoint, QueryParams::new()).await
    }

    pub async fn key_executives(&self, symbol: &str) -> Result<Vec<KeyExecutive>, ClientError> {
        let endpoint = format!("key-executives/{}", symbol_path(symbol)?);
        fetch(self.api, &endpoint, QueryParams::new()).await
    }

    pub async fn market_cap(&self, symbol: &str) -> Result<MarketCap, ClientError> {
        let endpoint = format!("market-capitalization/{}", symbol_path(symbol)?);
        fetch_first(self.api, &endpoint, QueryParams::new()).await
    }
}

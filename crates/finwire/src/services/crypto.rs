use finwire_core::{ClientError, QueryParams};
use time::Date;

use super::date_range;
use crate::api::{fetch, fetch_first, symbol_path, JsonApi};
use crate::types::{HistoricalPrices, Quote, SymbolListing};

/// Cryptocurrency listings and prices, quoted as pairs like `BTCUSD`.
pub struct CryptoService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> CryptoService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<SymbolListing>, ClientError> {
        fetch(
            self.api,
            "symbol/available-cryptocurrencies",
            QueryParams::new(),
        )
        .await
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote, ClientError> {
        let endpoint = format!("quote/{}", symbol_path(symbol)?);
        fetch_first(self.api, &endpoint, QueryParams::new()).await
    }

    pub async fn historical_prices(
        &self,
        symbol: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<HistoricalPrices, ClientError> {
        let endpoint = format!("historical-price-full/{}", symbol_path(symbol)?);
        fetch(self.api, &endpoint, date_range(from, to)?).await
    }
}

use finwire_core::{ClientError, QueryParams};
use time::Date;

use super::date_range;
use crate::api::{fetch, fetch_first, symbol_list, symbol_path, JsonApi};
use crate::types::{HistoricalPrices, Quote, QuoteShort};

/// Real-time quotes and daily price history for equities, ETFs, and indices.
pub struct QuoteService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> QuoteService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote, ClientError> {
        let endpoint = format!("quote/{}", symbol_path(symbol)?);
        fetch_first(self.api, &endpoint, QueryParams::new()).await
    }

    pub async fn quote_short(&self, symbol: &str) -> Result<QuoteShort, ClientError> {
        let endpoint = format!("quote-short/{}", symbol_path(symbol)?);
        fetch_first(self.api, &endpoint, QueryParams::new()).await
    }

    /// Quotes for several symbols in one call, in the order the API returns them.
    pub async fn batch_quotes<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<Quote>, ClientError> {
        let endpoint = format!("quote/{}", symbol_list(symbols)?);
        fetch(self.api, &endpoint, QueryParams::new()).await
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

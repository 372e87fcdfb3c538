use finwire_core::{ClientError, QueryParams};
use time::Date;

use super::date_range;
use crate::api::{fetch, fetch_first, symbol_path, JsonApi};
use crate::types::{HistoricalPrices, Quote, SymbolListing};

/// Currency pair listings and prices.
///
/// Pairs are accepted as `EURUSD` or `EUR/USD`.
pub struct ForexService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> ForexService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<SymbolListing>, ClientError> {
        fetch(
            self.api,
            "symbol/available-forex-currency-pairs",
            QueryParams::new(),
        )
        .await
    }

    pub async fn quote(&self, pair: &str) -> Result<Quote, ClientError> {
        let endpoint = format!("quote/{}", pair_path(pair)?);
        fetch_first(self.api, &endpoint, QueryParams::new()).await
    }

    pub async fn historical_prices(
        &self,
        pair: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<HistoricalPrices, ClientError> {
        let endpoint = format!("historical-price-full/{}", pair_path(pair)?);
        fetch(self.api, &endpoint, date_range(from, to)?).await
    }
}

fn pair_path(pair: &str) -> Result<String, ClientError> {
    let joined: String = pair.split('/').map(str::trim).collect();
    let normalized = symbol_path(&joined)?;
    if normalized.len() != 6 || !normalized.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ClientError::invalid_input(format!(
            "currency pair '{pair}' must be two three-letter codes"
        )));
    }
    Ok(normalized)
}

use finwire_core::{ClientError, QueryParams};

use crate::api::{fetch, fetch_first, symbol_path, JsonApi};
use crate::types::{InsiderStatistics, InsiderTrade};

/// Insider transactions reported on SEC Form 4.
pub struct InsiderService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> InsiderService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    /// Most recent filings across all symbols. `page` starts at 0.
    pub async fn latest_trades(&self, page: u32) -> Result<Vec<InsiderTrade>, ClientError> {
        fetch(
            self.api,
            "insider-trading",
            QueryParams::new().with("page", page),
        )
        .await
    }

    pub async fn trades_by_symbol(
        &self,
        symbol: &str,
        page: u32,
    ) -> Result<Vec<InsiderTrade>, ClientError> {
        let params = QueryParams::new()
            .with("symbol", symbol_path(symbol)?)
            .with("page", page);
        fetch(self.api, "insider-trading", params).await
    }

    /// Latest quarterly roll-up for `symbol`.
    pub async fn statistics(&self, symbol: &str) -> Result<InsiderStatistics, ClientError> {
        let params = QueryParams::new().with("symbol", symbol_path(symbol)?);
        fetch_first(self.api, "insider-roaster-statistic", params).await
    }
}

use finwire_core::{ClientError, QueryParams};

use crate::api::{fetch, fetch_first, symbol_path, JsonApi};
use crate::types::{AnalystEstimate, Period, PriceTargetConsensus, StockGrade};

/// Sell-side estimates, price targets, and rating changes.
pub struct AnalystService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> AnalystService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn estimates(
        &self,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<Vec<AnalystEstimate>, ClientError> {
        let endpoint = format!("analyst-estimates/{}", symbol_path(symbol)?);
        let params = QueryParams::new()
            .with("period", period)
            .with_opt("limit", limit);
        fetch(self.api, &endpoint, params).await
    }

    pub async fn price_target_consensus(
        &self,
        symbol: &str,
    ) -> Result<PriceTargetConsensus, ClientError> {
        let params = QueryParams::new().with("symbol", symbol_path(symbol)?);
        fetch_first(self.api, "price-target-consensus", params).await
    }

    pub async fn grades(&self, symbol: &str, limit: Option<u32>) -> Result<Vec<StockGrade>, ClientError> {
        let endpoint = format!("grade/{}", symbol_path(symbol)?);
        fetch(self.api, &endpoint, QueryParams::new().with_opt("limit", limit)).await
    }
}

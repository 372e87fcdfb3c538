use finwire_core::{ClientError, QueryParams};

use crate::api::{fetch, JsonApi};
use crate::types::{MarketMover, SectorPerformance};

/// Market-wide movers and sector performance for the current session.
pub struct MarketService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> MarketService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn gainers(&self) -> Result<Vec<MarketMover>, ClientError> {
        fetch(self.api, "stock_market/gainers", QueryParams::new()).await
    }

    pub async fn losers(&self) -> Result<Vec<MarketMover>, ClientError> {
        fetch(self.api, "stock_market/losers", QueryParams::new()).await
    }

    pub async fn most_active(&self) -> Result<Vec<MarketMover>, ClientError> {
        fetch(self.api, "stock_market/actives", QueryParams::new()).await
    }

    pub async fn sector_performance(&self) -> Result<Vec<SectorPerformance>, ClientError> {
        fetch(self.api, "sectors-performance", QueryParams::new()).await
    }
}

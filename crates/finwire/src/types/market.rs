use serde::{Deserialize, Serialize};

/// Entry of the gainers, losers, and most-active lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMover {
    pub symbol: String,
    pub name: Option<String>,
    pub change: Option<f64>,
    pub price: Option<f64>,
    pub changes_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorPerformance {
    pub sector: String,
    /// Rendered by the API as a percentage string, e.g. `"-0.84%"`.
    pub changes_percentage: Option<String>,
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsEvent {
    pub date: String,
    pub symbol: String,
    pub eps: Option<f64>,
    pub eps_estimated: Option<f64>,
    /// `bmo` (before market open) or `amc` (after market close).
    pub time: Option<String>,
    pub revenue: Option<f64>,
    pub revenue_estimated: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendEvent {
    pub date: String,
    pub symbol: String,
    pub label: Option<String>,
    pub dividend: Option<f64>,
    pub adj_dividend: Option<f64>,
    pub record_date: Option<String>,
    pub payment_date: Option<String>,
    pub declaration_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitEvent {
    pub date: String,
    pub symbol: String,
    pub label: Option<String>,
    pub numerator: f64,
    pub denominator: f64,
}

impl SplitEvent {
    /// Shares held after the split per share held before it.
    pub fn ratio(&self) -> Option<f64> {
        (self.denominator != 0.0).then(|| self.numerator / self.denominator)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpoEvent {
    pub date: String,
    pub company: Option<String>,
    pub symbol: String,
    pub exchange: Option<String>,
    pub actions: Option<String>,
    pub shares: Option<f64>,
    pub price_range: Option<String>,
    pub market_cap: Option<f64>,
}

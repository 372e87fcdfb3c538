use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystEstimate {
    pub symbol: String,
    pub date: String,
    pub estimated_revenue_low: Option<f64>,
    pub estimated_revenue_high: Option<f64>,
    pub estimated_revenue_avg: Option<f64>,
    pub estimated_ebitda_avg: Option<f64>,
    pub estimated_eps_low: Option<f64>,
    pub estimated_eps_high: Option<f64>,
    pub estimated_eps_avg: Option<f64>,
    pub number_analyst_estimated_revenue: Option<u32>,
    pub number_analysts_estimated_eps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTargetConsensus {
    pub symbol: String,
    pub target_high: Option<f64>,
    pub target_low: Option<f64>,
    pub target_consensus: Option<f64>,
    pub target_median: Option<f64>,
}

/// Rating change published by a brokerage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockGrade {
    pub symbol: String,
    pub date: String,
    pub grading_company: Option<String>,
    pub previous_grade: Option<String>,
    pub new_grade: Option<String>,
}

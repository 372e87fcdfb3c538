use serde::{Deserialize, Serialize};

/// Form 4 transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsiderTrade {
    pub symbol: String,
    pub filing_date: Option<String>,
    pub transaction_date: Option<String>,
    pub reporting_cik: Option<String>,
    pub reporting_name: Option<String>,
    pub type_of_owner: Option<String>,
    pub transaction_type: Option<String>,
    pub securities_owned: Option<f64>,
    pub securities_transacted: Option<f64>,
    pub price: Option<f64>,
    pub security_name: Option<String>,
    pub link: Option<String>,
}

/// Quarterly purchase/sale roll-up for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsiderStatistics {
    pub symbol: String,
    pub cik: Option<String>,
    pub year: i32,
    pub quarter: u8,
    pub purchases: Option<u32>,
    pub sales: Option<u32>,
    pub buy_sell_ratio: Option<f64>,
    pub total_bought: Option<f64>,
    pub total_sold: Option<f64>,
}

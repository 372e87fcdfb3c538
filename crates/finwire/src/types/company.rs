use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    pub company_name: Option<String>,
    pub price: Option<f64>,
    pub beta: Option<f64>,
    pub vol_avg: Option<f64>,
    pub mkt_cap: Option<f64>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub exchange_short_name: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub ceo: Option<String>,
    pub ipo_date: Option<String>,
    pub is_etf: Option<bool>,
    pub is_actively_trading: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyExecutive {
    pub name: String,
    pub title: Option<String>,
    pub pay: Option<f64>,
    pub currency_pay: Option<String>,
    pub gender: Option<String>,
    pub year_born: Option<i32>,
    pub title_since: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCap {
    pub symbol: String,
    pub date: String,
    pub market_cap: f64,
}

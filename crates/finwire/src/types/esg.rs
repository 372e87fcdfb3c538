use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsgDisclosure {
    pub symbol: String,
    pub cik: Option<String>,
    pub company_name: Option<String>,
    pub form_type: Option<String>,
    pub accepted_date: Option<String>,
    pub date: Option<String>,
    pub environmental_score: Option<f64>,
    pub social_score: Option<f64>,
    pub governance_score: Option<f64>,
    #[serde(rename = "ESGScore")]
    pub esg_score: Option<f64>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsgRating {
    pub symbol: String,
    pub cik: Option<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "ESGRiskRating")]
    pub esg_risk_rating: Option<String>,
    pub industry_rank: Option<String>,
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Reporting period of a financial statement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Annual,
    Quarter,
}

impl Period {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarter => "quarter",
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    pub date: String,
    pub symbol: String,
    pub reported_currency: Option<String>,
    pub calendar_year: Option<String>,
    /// `FY`, `Q1` .. `Q4`.
    pub period: Option<String>,
    pub revenue: Option<f64>,
    pub cost_of_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_expenses: Option<f64>,
    pub operating_income: Option<f64>,
    pub ebitda: Option<f64>,
    pub net_income: Option<f64>,
    pub eps: Option<f64>,
    #[serde(rename = "epsdiluted")]
    pub eps_diluted: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub date: String,
    pub symbol: String,
    pub reported_currency: Option<String>,
    pub calendar_year: Option<String>,
    pub period: Option<String>,
    pub cash_and_cash_equivalents: Option<f64>,
    pub total_current_assets: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_current_liabilities: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub total_stockholders_equity: Option<f64>,
    pub total_debt: Option<f64>,
    pub net_debt: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowStatement {
    pub date: String,
    pub symbol: String,
    pub reported_currency: Option<String>,
    pub calendar_year: Option<String>,
    pub period: Option<String>,
    pub operating_cash_flow: Option<f64>,
    pub capital_expenditure: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub dividends_paid: Option<f64>,
    pub net_change_in_cash: Option<f64>,
}

use finwire_core::{ClientError, QueryParams};

use crate::api::{fetch, symbol_path, JsonApi};
use crate::types::{BalanceSheet, CashFlowStatement, IncomeStatement, Period};

/// Income statements, balance sheets, and cash flow statements.
///
/// Every call takes a [`Period`] and an optional `limit` on the number of
/// reports returned, newest first.
pub struct StatementService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> StatementService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn income_statements(
        &self,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<Vec<IncomeStatement>, ClientError> {
        self.statements("income-statement", symbol, period, limit)
            .await
    }

    pub async fn balance_sheets(
        &self,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<Vec<BalanceSheet>, ClientError> {
        self.statements("balance-sheet-statement", symbol, period, limit)
            .await
    }

    pub async fn cash_flow_statements(
        &self,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<Vec<CashFlowStatement>, ClientError> {
        self.statements("cash-flow-statement", symbol, period, limit)
            .await
    }

    async fn statements<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<Vec<T>, ClientError> {
        if limit == Some(0) {
            return Err(ClientError::invalid_input("limit must be at least 1"));
        }
        let endpoint = format!("{kind}/{}", symbol_path(symbol)?);
        let params = QueryParams::new()
            .with("period", period)
            .with_opt("limit", limit);
        fetch(self.api, &endpoint, params).await
    }
}

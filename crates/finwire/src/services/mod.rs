//! # Service Groups
//!
//! Stateless mappers from typed calls to `(endpoint, params)` pairs. Each group
//! borrows a [`JsonApi`](crate::JsonApi) and owns nothing else.

mod analyst;
mod calendar;
mod company;
mod crypto;
mod esg;
mod forex;
mod insider;
mod market;
mod quotes;
mod statements;

pub use analyst::AnalystService;
pub use calendar::CalendarService;
pub use company::CompanyService;
pub use crypto::CryptoService;
pub use esg::EsgService;
pub use forex::ForexService;
pub use insider::InsiderService;
pub use market::MarketService;
pub use quotes::QuoteService;
pub use statements::StatementService;

use finwire_core::{ClientError, QueryParams};
use time::Date;

/// `from`/`to` query parameters, rejecting inverted ranges.
pub(crate) fn date_range(from: Option<Date>, to: Option<Date>) -> Result<QueryParams, ClientError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ClientError::invalid_input(format!(
                "date range start {from} is after end {to}"
            )));
        }
    }
    Ok(QueryParams::new().with_opt("from", from).with_opt("to", to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn date_range_renders_iso_dates() {
        let params = date_range(Some(date!(2024 - 01 - 05)), Some(date!(2024 - 02 - 01)))
            .expect("valid range");

        assert_eq!(params.get("from"), Some("2024-01-05"));
        assert_eq!(params.get("to"), Some("2024-02-01"));
    }

    #[test]
    fn open_ranges_omit_missing_bounds() {
        let params = date_range(None, Some(date!(2024 - 02 - 01))).expect("valid range");

        assert_eq!(params.get("from"), None);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let error = date_range(Some(date!(2024 - 03 - 01)), Some(date!(2024 - 02 - 01)))
            .expect_err("inverted");

        assert!(matches!(error, ClientError::InvalidInput(_)));
    }
}

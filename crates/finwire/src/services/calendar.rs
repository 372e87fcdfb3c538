use finwire_core::ClientError;
use time::Date;

use super::date_range;
use crate::api::{fetch, JsonApi};
use crate::types::{DividendEvent, EarningsEvent, IpoEvent, SplitEvent};

/// Corporate event calendars over an optional `from..=to` date range.
///
/// The API applies its own default window when a bound is omitted.
pub struct CalendarService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> CalendarService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn earnings(
        &self,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<EarningsEvent>, ClientError> {
        fetch(self.api, "earning_calendar", date_range(from, to)?).await
    }

    pub async fn dividends(
        &self,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<DividendEvent>, ClientError> {
        fetch(self.api, "stock_dividend_calendar", date_range(from, to)?).await
    }

    pub async fn splits(
        &self,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<SplitEvent>, ClientError> {
        fetch(self.api, "stock_split_calendar", date_range(from, to)?).await
    }

    pub async fn ipos(
        &self,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<IpoEvent>, ClientError> {
        fetch(self.api, "ipo_calendar", date_range(from, to)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingApi;
    use serde_json::json;
    use time::macros::date;

    #[tokio::test]
    async fn splits_decode_ratio() {
        let api = RecordingApi::default().with_response(
            "stock_split_calendar",
            json!([{ "date": "2024-06-10", "symbol": "NVDA", "numerator": 10.0, "denominator": 1.0 }]),
        );

        let splits = CalendarService::new(&api)
            .splits(Some(date!(2024 - 06 - 01)), Some(date!(2024 - 06 - 30)))
            .await
            .expect("splits");

        assert_eq!(splits[0].ratio(), Some(10.0));
    }

    #[tokio::test]
    async fn inverted_range_never_reaches_the_api() {
        let api = RecordingApi::default();

        let result = CalendarService::new(&api)
            .earnings(Some(date!(2024 - 07 - 01)), Some(date!(2024 - 06 - 01)))
            .await;

        assert!(matches!(result, Err(ClientError::InvalidInput(_))));
        assert!(api.calls().is_empty());
    }
}

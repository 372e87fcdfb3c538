use finwire_core::{ClientError, QueryParams};

use crate::api::{fetch, symbol_path, JsonApi};
use crate::types::{EsgDisclosure, EsgRating};

/// Environmental, social, and governance scores.
pub struct EsgService<'a, C: ?Sized> {
    api: &'a C,
}

impl<'a, C: JsonApi + ?Sized> EsgService<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    pub async fn disclosures(&self, symbol: &str) -> Result<Vec<EsgDisclosure>, ClientError> {
        let params = QueryParams::new().with("symbol", symbol_path(symbol)?);
        fetch(self.api, "esg-environmental-social-governance-data", params).await
    }

    pub async fn ratings(&self, symbol: &str) -> Result<Vec<EsgRating>, ClientError> {
        let params = QueryParams::new().with("symbol", symbol_path(symbol)?);
        fetch(
            self.api,
            "esg-environmental-social-governance-data-ratings",
            params,
        )
        .await
    }
}

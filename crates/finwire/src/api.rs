//! The request seam every service group composes over.

use serde::de::DeserializeOwned;
use serde_json::Value;

use finwire_core::{ApiClient, BoxFuture, ClientError, QueryParams};

/// Issues a GET against the remote API and yields the raw JSON body.
///
/// `ApiClient` is the production implementation; tests substitute a
/// recording double.
pub trait JsonApi: Send + Sync {
    fn get_value<'a>(
        &'a self,
        endpoint: &'a str,
        params: QueryParams,
    ) -> BoxFuture<'a, Result<Value, ClientError>>;
}

impl JsonApi for ApiClient {
    fn get_value<'a>(
        &'a self,
        endpoint: &'a str,
        params: QueryParams,
    ) -> BoxFuture<'a, Result<Value, ClientError>> {
        Box::pin(self.get::<Value>(endpoint, params))
    }
}

/// GET `endpoint` and decode the body into `T`.
pub(crate) async fn fetch<C, T>(api: &C, endpoint: &str, params: QueryParams) -> Result<T, ClientError>
where
    C: JsonApi + ?Sized,
    T: DeserializeOwned,
{
    let value = api.get_value(endpoint, params).await?;
    serde_json::from_value(value).map_err(|source| ClientError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// GET an endpoint that wraps a single object in an array.
pub(crate) async fn fetch_first<C, T>(
    api: &C,
    endpoint: &str,
    params: QueryParams,
) -> Result<T, ClientError>
where
    C: JsonApi + ?Sized,
    T: DeserializeOwned,
{
    let items: Vec<T> = fetch(api, endpoint, params).await?;
    items
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::EmptyResult {
            endpoint: endpoint.to_string(),
        })
}

/// Normalizes a ticker for use as a path segment.
pub(crate) fn symbol_path(symbol: &str) -> Result<String, ClientError> {
    let normalized = symbol.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(ClientError::invalid_input("symbol must not be empty"));
    }
    if let Some(ch) = normalized
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '^' | '=')))
    {
        return Err(ClientError::invalid_input(format!(
            "symbol '{normalized}' contains invalid character '{ch}'"
        )));
    }
    Ok(normalized)
}

/// Joins symbols for batch endpoints such as `quote/AAPL,MSFT`.
pub(crate) fn symbol_list<S: AsRef<str>>(symbols: &[S]) -> Result<String, ClientError> {
    if symbols.is_empty() {
        return Err(ClientError::invalid_input("at least one symbol is required"));
    }
    let normalized = symbols
        .iter()
        .map(|symbol| symbol_path(symbol.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(normalized.join(","))
}

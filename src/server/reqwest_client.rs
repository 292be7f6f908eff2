//! Reqwest-based implementation of the `SignalHttpClient` trait.

use std::time::Duration;

use async_trait::async_trait;
use http::HeaderMap as HttpHeaderMap;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::{SignalHttpClient, SignalHttpClientError, SignalHttpResponse};

/// Reqwest-backed transport for vendor API calls.
pub struct ReqwestSignalClient {
    client: Client,
}

impl ReqwestSignalClient {
    pub fn new(timeout: Duration) -> Result<Self, SignalHttpClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SignalHttpClientError::Transport(err.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SignalHttpClient for ReqwestSignalClient {
    async fn get(
        &self,
        url: &Url,
        headers: &HttpHeaderMap,
    ) -> Result<SignalHttpResponse, SignalHttpClientError> {
        let response = self
            .client
            .get(url.as_str())
            .headers(convert_headers(headers)?)
            .send()
            .await
            .map_err(|err| SignalHttpClientError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| SignalHttpClientError::Transport(err.to_string()))?;

        Ok(SignalHttpResponse { status, body })
    }
}

fn convert_headers(headers: &HttpHeaderMap) -> Result<HeaderMap, SignalHttpClientError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers.iter() {
        let name = HeaderName::from_bytes(name.as_str().as_bytes())
            .map_err(|err| SignalHttpClientError::Transport(err.to_string()))?;
        let value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|err| SignalHttpClientError::Transport(err.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn transport_is_shareable_across_tasks() {
        assert_send_sync::<ReqwestSignalClient>();
    }

    #[test]
    fn headers_convert_to_reqwest() {
        let mut headers = HttpHeaderMap::new();
        headers.insert("auth-api-key", http::HeaderValue::from_static("sk_test"));
        let converted = convert_headers(&headers).unwrap();
        assert_eq!(converted.get("Auth-API-Key").unwrap(), "sk_test");
    }
}

//! Live HTTP fetcher.
//!
//! Queries a Kamereon-style car adapter API:
//! `GET {endpoint}/cars/{vin}/{channel endpoint}`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use carwatch_adapters::http::HttpFetcher;
//! use carwatch_poller::Fetcher;
//! use carwatch_types::Channel;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = HttpFetcher::builder()
//!         .endpoint("https://api.example.com/commerce/v1/accounts/1234/kamereon/kca/car-adapter/v1")
//!         .vin("VF1AAAAA555777999")
//!         .api_key("my-api-key")
//!         .build()?;
//!
//!     let snapshot = fetcher.fetch(Channel::Battery).await?;
//!     println!("battery: {:?}", snapshot.get_f64("batteryLevel"));
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use carwatch_poller::{FetchError, Fetcher};
use carwatch_types::{Channel, Snapshot};
use reqwest::{Client, StatusCode};

use crate::{kamereon, AdapterError};

/// Fetcher for one vehicle on a live API.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    endpoint: String,
    vin: String,
    api_key: Option<String>,
    token: Option<String>,
    description: String,
}

impl HttpFetcher {
    /// Create a new builder for configuring the fetcher.
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }

    fn url(&self, channel: Channel) -> String {
        format!("{}/cars/{}/{}", self.endpoint, self.vin, channel.endpoint())
    }

    async fn get(&self, channel: Channel) -> Result<(StatusCode, String), AdapterError> {
        let mut request = self.client.get(self.url(channel));
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

/// Turn a status and body into a snapshot or a classified error.
///
/// Error codes in the body are more precise than the status, so they are
/// checked first.
fn interpret(channel: Channel, status: StatusCode, body: &str) -> Result<Snapshot, FetchError> {
    match kamereon::parse(channel, body) {
        Ok(snapshot) if status.is_success() => return Ok(snapshot),
        Err(err @ AdapterError::Api { .. }) => return Err(err.into()),
        Err(err) if status.is_success() => return Err(err.into()),
        _ => {}
    }

    let detail = format!("{channel}: HTTP {status}");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::AccessDenied(detail),
        StatusCode::TOO_MANY_REQUESTS => FetchError::QuotaExceeded(detail),
        StatusCode::NOT_IMPLEMENTED => FetchError::NotSupported(detail),
        _ => FetchError::Remote(detail),
    })
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, channel: Channel) -> Result<Snapshot, FetchError> {
        let (status, body) = self.get(channel).await?;
        tracing::debug!(vin = %self.vin, %channel, %status, "fetched");
        interpret(channel, status, &body)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for HttpFetcher.
#[derive(Debug, Default)]
pub struct HttpFetcherBuilder {
    endpoint: Option<String>,
    vin: Option<String>,
    api_key: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl HttpFetcherBuilder {
    /// Set the API base URL, up to but excluding `/cars`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the vehicle to query.
    pub fn vin(mut self, vin: impl Into<String>) -> Self {
        self.vin = Some(vin.into());
        self
    }

    /// Set the API key sent in the `apikey` header.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set a bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the fetcher.
    pub fn build(self) -> Result<HttpFetcher, AdapterError> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| AdapterError::Config("endpoint is required".to_string()))?;
        let vin = self
            .vin
            .ok_or_else(|| AdapterError::Config("vin is required".to_string()))?;

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(10)))
            .build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        Ok(HttpFetcher {
            description: format!("http: {endpoint} ({vin})"),
            client,
            endpoint,
            vin,
            api_key: self.api_key,
            token: self.token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::builder()
            .endpoint("https://api.example.com/car-adapter/v1/")
            .vin("VF1AAAAA555777999")
            .build()
            .unwrap()
    }

    #[test]
    fn builds_urls_from_channel_endpoints() {
        let fetcher = fetcher();
        assert_eq!(
            fetcher.url(Channel::Battery),
            "https://api.example.com/car-adapter/v1/cars/VF1AAAAA555777999/battery-status"
        );
        assert_eq!(
            fetcher.url(Channel::ResState),
            "https://api.example.com/car-adapter/v1/cars/VF1AAAAA555777999/res-state"
        );
    }

    #[test]
    fn builder_requires_endpoint_and_vin() {
        assert!(matches!(
            HttpFetcher::builder().vin("VF1").build(),
            Err(AdapterError::Config(_))
        ));
        assert!(matches!(
            HttpFetcher::builder().endpoint("https://x").build(),
            Err(AdapterError::Config(_))
        ));
    }

    #[test]
    fn success_body_becomes_snapshot() {
        let body = r#"{"data":{"attributes":{"lockStatus":"locked"}}}"#;
        let snapshot = interpret(Channel::Lock, StatusCode::OK, body).unwrap();
        assert_eq!(snapshot.get_str("lockStatus"), Some("locked"));
    }

    #[test]
    fn statuses_are_classified() {
        let cases = [
            (StatusCode::UNAUTHORIZED, "AccessDenied"),
            (StatusCode::FORBIDDEN, "AccessDenied"),
            (StatusCode::TOO_MANY_REQUESTS, "QuotaExceeded"),
            (StatusCode::NOT_IMPLEMENTED, "NotSupported"),
            (StatusCode::BAD_GATEWAY, "Remote"),
        ];
        for (status, expected) in cases {
            let err = interpret(Channel::Hvac, status, "").unwrap_err();
            let name = match err {
                FetchError::AccessDenied(_) => "AccessDenied",
                FetchError::QuotaExceeded(_) => "QuotaExceeded",
                FetchError::NotSupported(_) => "NotSupported",
                FetchError::Remote(_) => "Remote",
            };
            assert_eq!(name, expected, "status {status}");
        }
    }

    #[test]
    fn body_error_code_beats_status() {
        let body = r#"{"errors":[{"errorCode":"err.tech.501","errorMessage":"This feature is not technically supported by this gateway"}]}"#;
        let err = interpret(Channel::ResState, StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, FetchError::NotSupported(_)));
    }

    #[test]
    fn unparseable_success_is_remote() {
        let err = interpret(Channel::Lock, StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, FetchError::Remote(_)));
    }
}

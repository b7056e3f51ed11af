//! Fetcher construction from configured sources.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use carwatch_adapters::ReplayFetcher;
use carwatch_poller::Fetcher;

use crate::config::SourceConfig;

/// Build the fetcher for one vehicle.
///
/// Relative replay directories are resolved against `base`, normally the
/// directory holding the configuration file.
pub fn build_fetcher(vin: &str, source: &SourceConfig, base: &Path) -> Result<Arc<dyn Fetcher>> {
    match source {
        SourceConfig::Replay { dir } => {
            let dir = if dir.is_relative() {
                base.join(dir)
            } else {
                dir.clone()
            };
            Ok(Arc::new(ReplayFetcher::new(dir)))
        }
        SourceConfig::Http {
            endpoint,
            api_key,
            token,
            timeout,
        } => http_fetcher(vin, endpoint, api_key.as_deref(), token.as_deref(), timeout.as_deref()),
    }
}

#[cfg(feature = "http")]
fn http_fetcher(
    vin: &str,
    endpoint: &str,
    api_key: Option<&str>,
    token: Option<&str>,
    timeout: Option<&str>,
) -> Result<Arc<dyn Fetcher>> {
    use anyhow::Context;
    use carwatch_adapters::HttpFetcher;

    let mut builder = HttpFetcher::builder().endpoint(endpoint).vin(vin);
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    if let Some(token) = token {
        builder = builder.token(token);
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(crate::duration::parse_duration(timeout).context("source.timeout")?);
    }

    let fetcher = builder
        .build()
        .with_context(|| format!("vehicle {vin}: cannot build http source"))?;
    Ok(Arc::new(fetcher))
}

#[cfg(not(feature = "http"))]
fn http_fetcher(
    vin: &str,
    _endpoint: &str,
    _api_key: Option<&str>,
    _token: Option<&str>,
    _timeout: Option<&str>,
) -> Result<Arc<dyn Fetcher>> {
    anyhow::bail!("vehicle {vin}: http sources need the `http` feature")
}

//! HTTP client construction

use crate::config::SourceConfig;
use crate::WeaveError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy};
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("citeweave/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client used for all remote fetches
///
/// Timeouts, the optional proxy and any custom headers come from the source
/// configuration. Per-request timeouts live here, never in the crawl engine.
///
/// # Example
///
/// ```no_run
/// use citeweave::config::SourceConfig;
/// use citeweave::source::build_http_client;
///
/// let client = build_http_client(&SourceConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &SourceConfig) -> Result<Client, WeaveError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| WeaveError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| WeaveError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    Ok(builder.build()?)
}

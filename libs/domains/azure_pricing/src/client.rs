//! Azure Retail Prices API client
//!
//! https://learn.microsoft.com/en-us/rest/api/cost-management/retail-prices/azure-retail-prices

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::config::PricingConfig;
use crate::error::{PricingError, PricingResult};
use crate::metrics::PricingMetrics;
use crate::models::{MAX_PAGE_SIZE, PricePage};
use crate::retry::retry_with_backoff;

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 200;

/// One request against the retail prices API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    /// `$filter` expression
    pub filter: Option<String>,
    pub currency_code: String,
    /// `$top`; `None` lets the upstream default page size apply
    pub top: Option<usize>,
}

impl PriceQuery {
    /// `$top` is sent only when `limit` is below the page ceiling, so the
    /// server truncates for us. Larger limits are truncated locally.
    pub fn new(filter: Option<String>, currency_code: impl Into<String>, limit: usize) -> Self {
        Self {
            filter,
            currency_code: currency_code.into(),
            top: (limit < MAX_PAGE_SIZE).then_some(limit),
        }
    }
}

/// Source of retail price pages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch one page for `query`
    async fn fetch(&self, query: &PriceQuery) -> PricingResult<PricePage>;
}

/// Full request URL for `query`
pub fn build_request_url(base_url: &str, api_version: &str, query: &PriceQuery) -> String {
    let mut url = format!(
        "{}?api-version={}&currencyCode={}",
        base_url,
        urlencoding::encode(api_version),
        urlencoding::encode(&query.currency_code)
    );

    if let Some(filter) = &query.filter {
        url.push_str("&$filter=");
        url.push_str(&urlencoding::encode(filter));
    }
    if let Some(top) = query.top {
        url.push_str(&format!("&$top={}", top));
    }

    url
}

/// HTTP client owning one session for the duration of a tool call.
///
/// The session is opened by [`AzurePricingClient::connect`] and released by
/// [`AzurePricingClient::close`] or when the client is dropped. Fetching on a
/// closed client is a [`PricingError::Configuration`] error.
pub struct AzurePricingClient {
    config: PricingConfig,
    http: Option<Client>,
}

impl AzurePricingClient {
    pub fn connect(config: PricingConfig) -> PricingResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("azure-pricing/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PricingError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        debug!(base_url = %config.base_url, "HTTP session opened");

        Ok(Self {
            config,
            http: Some(http),
        })
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.http.is_some()
    }

    /// Release the HTTP session. Idempotent.
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            debug!("HTTP session released");
        }
    }

    /// Verify the endpoint answers a one-row query
    pub async fn health_check(&self) -> PricingResult<bool> {
        let page = self
            .fetch(&PriceQuery::new(None, self.config.default_currency.clone(), 1))
            .await?;
        Ok(!page.items.is_empty())
    }

    async fn fetch_once(&self, http: &Client, url: &str) -> PricingResult<PricePage> {
        let response = http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(PricingError::UpstreamStatus {
                status: status.as_u16(),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| PricingError::Parse(e.to_string()))
    }
}

impl Drop for AzurePricingClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl PriceSource for AzurePricingClient {
    #[instrument(skip_all, fields(filter = ?query.filter, top = ?query.top))]
    async fn fetch(&self, query: &PriceQuery) -> PricingResult<PricePage> {
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| PricingError::Configuration("HTTP session not initialized".to_string()))?;

        let url = build_request_url(&self.config.base_url, &self.config.api_version, query);
        let start = Instant::now();

        let result = retry_with_backoff(|| self.fetch_once(http, &url), &self.config.retry).await;

        match &result {
            Ok(page) => PricingMetrics::record_upstream_request("success", page.items.len(), start.elapsed()),
            Err(_) => PricingMetrics::record_upstream_request("error", 0, start.elapsed()),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;

    #[test]
    fn test_top_sent_below_ceiling() {
        let query = PriceQuery::new(None, "USD", 50);
        assert_eq!(query.top, Some(50));
    }

    #[test]
    fn test_top_omitted_at_or_above_ceiling() {
        assert_eq!(PriceQuery::new(None, "USD", 1000).top, None);
        assert_eq!(PriceQuery::new(None, "USD", 5000).top, None);
    }

    #[test]
    fn test_request_url_without_filter() {
        let query = PriceQuery::new(None, "EUR", 1000);
        let url = build_request_url("https://prices.azure.com/api/retail/prices", "2023-01-01-preview", &query);
        assert_eq!(
            url,
            "https://prices.azure.com/api/retail/prices?api-version=2023-01-01-preview&currencyCode=EUR"
        );
    }

    #[test]
    fn test_request_url_encodes_filter() {
        let query = PriceQuery::new(
            Some("serviceName eq 'Virtual Machines' and armRegionName eq 'eastus'".to_string()),
            "USD",
            10,
        );
        let url = build_request_url("https://example.test/prices", "2023-01-01-preview", &query);
        assert_eq!(
            url,
            "https://example.test/prices?api-version=2023-01-01-preview&currencyCode=USD\
             &$filter=serviceName%20eq%20%27Virtual%20Machines%27%20and%20armRegionName%20eq%20%27eastus%27\
             &$top=10"
        );
    }

    #[tokio::test]
    async fn test_truncated_body_is_retried() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));

        let served = Arc::clone(&attempts);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                served.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                // Promise more bytes than are sent, then hang up.
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                          Content-Length: 200\r\nConnection: close\r\n\r\n{\"Items\":[",
                    )
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let config = PricingConfig {
            base_url: format!("http://{}/prices", addr),
            retry: RetryConfig::new()
                .with_max_retries(1)
                .with_initial_delay(1)
                .without_jitter(),
            ..PricingConfig::default()
        };
        let client = AzurePricingClient::connect(config).unwrap();

        let err = client
            .fetch(&PriceQuery::new(None, "USD", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, PricingError::Http(_)));
        assert!(err.is_retryable());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_closed_client_is_configuration_error() {
        let mut client = AzurePricingClient::connect(PricingConfig::default()).unwrap();
        assert!(client.is_open());

        client.close();
        assert!(!client.is_open());

        let err = client
            .fetch(&PriceQuery::new(None, "USD", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::Configuration(_)));

        // closing twice is fine
        client.close();
    }
}

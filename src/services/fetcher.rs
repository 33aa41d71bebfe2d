// src/services/fetcher.rs

//! Rate-limited JSON fetcher for the inventory API.
//!
//! Every request waits a random delay, then takes one of a fixed number of
//! permits for the duration of the network call. The permit count is shared by
//! every stage holding the fetcher, which makes it the only limit on outbound
//! request rate.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

use crate::error::{FetchError, Result};
use crate::models::ScraperConfig;
use crate::utils::{DelayRange, HeaderTemplate, create_async_client};

/// Source of JSON documents.
#[async_trait]
pub trait JsonFetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> std::result::Result<Value, FetchError>;
}

/// Fetch and decode into a typed record.
pub async fn fetch_as<T: DeserializeOwned>(
    fetcher: &dyn JsonFetch,
    url: &Url,
) -> std::result::Result<T, FetchError> {
    let value = fetcher.fetch(url).await?;
    serde_json::from_value(value).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// HTTP fetcher with a global concurrency cap and jittered pre-request delay.
pub struct RateLimitedFetcher {
    client: reqwest::Client,
    headers: HeaderTemplate,
    permits: Semaphore,
    delay: DelayRange,
}

impl RateLimitedFetcher {
    pub fn new(
        client: reqwest::Client,
        headers: HeaderTemplate,
        max_concurrent: usize,
        delay: DelayRange,
    ) -> Self {
        Self {
            client,
            headers,
            permits: Semaphore::new(max_concurrent.max(1)),
            delay,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        let headers = HeaderTemplate::from_config(config)?;
        log::debug!(
            "Fetcher ready: max_concurrent={}, delay={}..{}s, timeout={}s",
            config.max_concurrent,
            config.min_delay_secs,
            config.max_delay_secs,
            config.timeout_secs
        );
        Ok(Self::new(
            client,
            headers,
            config.max_concurrent,
            DelayRange::from_secs_f64(config.min_delay_secs, config.max_delay_secs),
        ))
    }

    /// Permits not currently held by an in-flight request.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl JsonFetch for RateLimitedFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<Value, FetchError> {
        self.delay.wait().await;
        let headers = self.headers.build();

        let bytes = {
            // `None` only if the semaphore was closed, which never happens.
            let _permit = self.permits.acquire().await.ok();

            let response = self
                .client
                .get(url.clone())
                .headers(headers)
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                log::error!("GET {} returned {}", url, status.as_u16());
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            response
                .bytes()
                .await
                .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?
        };

        log::debug!("GET {} ({} bytes)", url, bytes.len());
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

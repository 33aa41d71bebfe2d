// src/utils/http.rs

//! HTTP client utilities.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::error::{AppError, Result};
use crate::models::ScraperConfig;

/// Create a configured asynchronous HTTP client.
///
/// The User-Agent is not fixed here; it is picked per request from a [`HeaderTemplate`].
pub fn create_async_client(config: &ScraperConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Read-only header set with a pool of User-Agent strings.
///
/// Every call to [`HeaderTemplate::build`] returns a fresh map, so concurrent
/// requests never share mutable header state.
#[derive(Debug, Clone)]
pub struct HeaderTemplate {
    base: HeaderMap,
    user_agents: Vec<HeaderValue>,
}

impl HeaderTemplate {
    pub fn new(headers: &BTreeMap<String, String>, user_agents: &[String]) -> Result<Self> {
        let mut base = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::config(format!("invalid header name '{name}': {e}")))?;
            // The pool supplies the User-Agent.
            if name == USER_AGENT {
                continue;
            }
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::config(format!("invalid value for header '{name}': {e}")))?;
            base.insert(name, value);
        }

        let user_agents = user_agents
            .iter()
            .map(|ua| ua.trim())
            .filter(|ua| !ua.is_empty())
            .map(|ua| {
                HeaderValue::from_str(ua)
                    .map_err(|e| AppError::config(format!("invalid User-Agent '{ua}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        if user_agents.is_empty() {
            return Err(AppError::config("User-Agent pool is empty"));
        }

        Ok(Self { base, user_agents })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        Self::new(&config.headers, &config.user_agents)
    }

    /// Headers for one request, with a randomly chosen User-Agent.
    pub fn build(&self) -> HeaderMap {
        let mut headers = self.base.clone();
        if let Some(ua) = self.user_agents.choose(&mut rand::rng()) {
            headers.insert(USER_AGENT, ua.clone());
        }
        headers
    }
}

/// Uniform random delay within `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Build from second bounds. Inverted or negative bounds are clamped,
    /// NaN reads as zero and overflowing values as `Duration::MAX`.
    pub fn from_secs_f64(min_secs: f64, max_secs: f64) -> Self {
        let min = secs_to_duration(min_secs);
        let max = secs_to_duration(max_secs).max(min);
        Self { min, max }
    }

    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }

    /// Sleep for a sampled duration.
    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

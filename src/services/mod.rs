//! Service layer for the sticker crawler.
//!
//! This module contains the outbound integrations and matching rules:
//! - Rate-limited inventory fetching (`RateLimitedFetcher`)
//! - Sticker keyword matching (`KeywordMatcher`)
//! - Alert delivery (`TelegramNotifier`)

mod fetcher;
mod matcher;
mod notifier;

pub use fetcher::{JsonFetch, RateLimitedFetcher, fetch_as};
pub use matcher::KeywordMatcher;
pub use notifier::{Credentials, Notifier, TelegramNotifier};

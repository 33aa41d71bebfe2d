//! In-memory stand-ins for the network and storage seams, used by unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::{DeliveryError, FetchError, Result};
use crate::models::Alert;
use crate::services::{JsonFetch, Notifier};
use crate::storage::SeenLedger;

type Responder = dyn Fn(&Url) -> std::result::Result<Value, FetchError> + Send + Sync;

/// Answers every request through a closure and records the URLs asked for.
pub struct FakeFetcher {
    respond: Box<Responder>,
    requests: Mutex<Vec<Url>>,
}

impl FakeFetcher {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&Url) -> std::result::Result<Value, FetchError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl JsonFetch for FakeFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<Value, FetchError> {
        self.requests.lock().unwrap().push(url.clone());
        (self.respond)(url)
    }
}

/// Records delivered alerts; optionally rejects every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub delivered: Mutex<Vec<Alert>>,
    pub reject_with: Option<u16>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, alert: &Alert) -> std::result::Result<(), DeliveryError> {
        if let Some(status) = self.reject_with {
            return Err(DeliveryError::Status {
                status,
                body: "rejected".into(),
            });
        }
        self.delivered.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    ids: Mutex<HashSet<String>>,
}

#[async_trait]
impl SeenLedger for MemoryLedger {
    async fn exists(&self, item_id: &str) -> Result<bool> {
        Ok(self.ids.lock().unwrap().contains(item_id))
    }

    async fn insert(&self, item_id: &str) -> Result<bool> {
        Ok(self.ids.lock().unwrap().insert(item_id.to_string()))
    }

    async fn purge(&self, _retention: chrono::Duration) -> Result<u64> {
        Ok(0)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.ids.lock().unwrap().len() as u64)
    }

    async fn close(&self) {}
}

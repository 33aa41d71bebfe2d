// src/pipeline/stages.rs

//! Worker stages of the scraping pipeline.
//!
//! ```text
//! groups ──▶ GroupStage ──▶ items ──▶ ItemStage ──▶ alerts ──▶ NotifyStage
//! ```
//!
//! Each stage runs as a pool of identical workers draining one queue. A
//! failed job is logged and kept in the worker's report; the worker then moves
//! on to the next job, so one bad group or item never takes its siblings down.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{Alert, GroupId, ImageResponse, InventoryPage, Item};
use crate::pipeline::queue::{QueueReceiver, QueueSender};
use crate::services::{JsonFetch, KeywordMatcher, Notifier, fetch_as};
use crate::storage::SeenLedger;
use crate::utils::{DelayRange, Endpoints};

/// Pipeline stage a worker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Group,
    Item,
    Notify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Group => "group",
            Stage::Item => "item",
            Stage::Notify => "notify",
        })
    }
}

/// Handles one job taken from a stage's input queue.
#[async_trait]
pub trait StageWorker<T>: Send + Sync {
    /// Returns how many jobs were forwarded downstream (or delivered, for the last stage).
    async fn process(&self, job: T) -> Result<usize>;
}

/// Outcome of one worker's lifetime.
#[derive(Debug)]
pub struct WorkerReport {
    pub stage: Stage,
    pub worker: usize,
    /// Jobs handled without error.
    pub processed: usize,
    /// Jobs forwarded downstream or delivered.
    pub produced: usize,
    /// Errors of the jobs that failed.
    pub failures: Vec<AppError>,
}

impl WorkerReport {
    fn new(stage: Stage, worker: usize) -> Self {
        Self {
            stage,
            worker,
            processed: 0,
            produced: 0,
            failures: Vec::new(),
        }
    }
}

/// Spawn `size` workers draining `queue` with a shared handler.
pub fn spawn_pool<T, W>(
    stage: Stage,
    size: usize,
    queue: QueueReceiver<T>,
    handler: Arc<W>,
) -> Vec<JoinHandle<WorkerReport>>
where
    T: Send + 'static,
    W: StageWorker<T> + 'static,
{
    log::info!("Starting {} {} worker(s)", size, stage);
    (0..size)
        .map(|index| {
            let queue = queue.clone();
            let handler = Arc::clone(&handler);
            tokio::spawn(run_worker(stage, index, queue, handler))
        })
        .collect()
}

async fn run_worker<T, W>(
    stage: Stage,
    index: usize,
    queue: QueueReceiver<T>,
    handler: Arc<W>,
) -> WorkerReport
where
    W: StageWorker<T>,
{
    let mut report = WorkerReport::new(stage, index);
    while let Some(job) = queue.next().await {
        match handler.process(job).await {
            Ok(produced) => {
                report.processed += 1;
                report.produced += produced;
            }
            Err(e) => {
                log::error!("{} worker #{} dropped a job: {}", stage, index, e);
                report.failures.push(e);
            }
        }
    }
    log::debug!(
        "{} worker #{} finished ({} ok, {} failed)",
        stage,
        index,
        report.processed,
        report.failures.len()
    );
    report
}

// --- Group stage ---

/// Fetches every item of a listing group and queues them.
pub struct GroupStage {
    fetcher: Arc<dyn JsonFetch>,
    endpoints: Arc<Endpoints>,
    page_limit: u32,
    items: QueueSender<Item>,
}

impl GroupStage {
    pub fn new(
        fetcher: Arc<dyn JsonFetch>,
        endpoints: Arc<Endpoints>,
        page_limit: u32,
        items: QueueSender<Item>,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            page_limit,
            items,
        }
    }
}

#[async_trait]
impl StageWorker<GroupId> for GroupStage {
    async fn process(&self, group: GroupId) -> Result<usize> {
        let url = self.endpoints.group_items(&group, self.page_limit);
        let page: InventoryPage = fetch_as(self.fetcher.as_ref(), &url).await?;

        let count = page.items.len();
        for item in page.items {
            self.items.push(item)?;
        }
        log::debug!("Group {}: queued {} item(s)", group, count);
        Ok(count)
    }
}

// --- Item stage ---

/// Result of the item decision procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDecision {
    /// Id already in the ledger; nothing fetched.
    AlreadySeen,
    /// No keyword found on any sticker.
    NoMatch,
    /// Another worker recorded the same id first.
    Duplicate,
    /// Alert queued and id recorded.
    Alerted,
}

/// Filters items by sticker keywords and the seen-item ledger, then queues alerts.
pub struct ItemStage {
    fetcher: Arc<dyn JsonFetch>,
    endpoints: Arc<Endpoints>,
    ledger: Arc<dyn SeenLedger>,
    matcher: Arc<KeywordMatcher>,
    alerts: QueueSender<Alert>,
}

impl ItemStage {
    pub fn new(
        fetcher: Arc<dyn JsonFetch>,
        endpoints: Arc<Endpoints>,
        ledger: Arc<dyn SeenLedger>,
        matcher: Arc<KeywordMatcher>,
        alerts: QueueSender<Alert>,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            ledger,
            matcher,
            alerts,
        }
    }

    /// Decide what to do with one item, cheapest checks first.
    ///
    /// The ledger insert is the atomic claim: only the worker whose insert
    /// succeeds queues the alert.
    pub async fn evaluate(&self, item: &Item) -> Result<ItemDecision> {
        if self.ledger.exists(&item.id).await? {
            return Ok(ItemDecision::AlreadySeen);
        }
        if !self.matcher.matches(item) {
            return Ok(ItemDecision::NoMatch);
        }

        let url = self.endpoints.item_image(&item.id);
        let image: ImageResponse = fetch_as(self.fetcher.as_ref(), &url).await?;
        let image_path = image.front().map(str::to_string);
        if image_path.is_none() {
            log::info!("No image data found for item ID {}", item.id);
        }
        let alert = Alert::for_item(item, image_path);

        if !self.ledger.insert(&item.id).await? {
            return Ok(ItemDecision::Duplicate);
        }
        self.alerts.push(alert)?;
        log::info!("Match: {} ({})", item.name, item.id);
        Ok(ItemDecision::Alerted)
    }
}

#[async_trait]
impl StageWorker<Item> for ItemStage {
    async fn process(&self, item: Item) -> Result<usize> {
        let decision = self.evaluate(&item).await?;
        log::debug!("Item {}: {:?}", item.id, decision);
        Ok(usize::from(decision == ItemDecision::Alerted))
    }
}

// --- Notify stage ---

/// Delivers alerts. Delivery failures are logged and swallowed.
pub struct NotifyStage {
    notifier: Arc<dyn Notifier>,
    delay: DelayRange,
}

impl NotifyStage {
    pub fn new(notifier: Arc<dyn Notifier>, delay: DelayRange) -> Self {
        Self { notifier, delay }
    }
}

#[async_trait]
impl StageWorker<Alert> for NotifyStage {
    async fn process(&self, alert: Alert) -> Result<usize> {
        self.delay.wait().await;
        match self.notifier.deliver(&alert).await {
            Ok(()) => Ok(1),
            Err(e) => {
                log::error!(
                    "Alert delivery failed: {}\n{}\n{}",
                    e,
                    alert.message,
                    alert.image_path.as_deref().unwrap_or("<no image>")
                );
                Ok(0)
            }
        }
    }
}

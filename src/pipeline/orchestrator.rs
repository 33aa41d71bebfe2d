// src/pipeline/orchestrator.rs

//! Wires the stages together and runs one full scrape.
//!
//! Lifecycle: `Idle → Discovering → WorkersRunning → Draining → Closed`.
//!
//! Draining closes the queues front to back: the group queue first, the item
//! queue once every group worker has exited, and the alert queue once every
//! item worker has exited. Each queue receives exactly one close signal per
//! worker of its pool, and nothing an upstream worker produces is stranded
//! behind a close signal.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{Alert, Config, GroupId, Item, WorkerConfig};
use crate::pipeline::discover::{DiscoveryReport, Paginator, discover_groups};
use crate::pipeline::queue::{QueueSender, work_queue};
use crate::pipeline::stages::{
    GroupStage, ItemStage, NotifyStage, Stage, WorkerReport, spawn_pool,
};
use crate::services::{
    Credentials, JsonFetch, KeywordMatcher, Notifier, RateLimitedFetcher, TelegramNotifier,
};
use crate::storage::{SeenLedger, SqliteLedger};
use crate::utils::{DelayRange, Endpoints, HeaderTemplate, create_async_client};

/// Orchestrator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    WorkersRunning,
    Draining,
    Closed,
}

/// Totals of one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub discovery: DiscoveryReport,
    pub reports: Vec<WorkerReport>,
    /// Workers that panicked or were cancelled.
    pub lost_workers: Vec<AppError>,
    /// Close signals sent to each stage's input queue.
    pub closes_sent: HashMap<Stage, usize>,
}

impl RunSummary {
    pub fn processed(&self, stage: Stage) -> usize {
        self.stage_reports(stage).map(|r| r.processed).sum()
    }

    pub fn produced(&self, stage: Stage) -> usize {
        self.stage_reports(stage).map(|r| r.produced).sum()
    }

    pub fn alerts_queued(&self) -> usize {
        self.produced(Stage::Item)
    }

    pub fn alerts_delivered(&self) -> usize {
        self.produced(Stage::Notify)
    }

    /// Failed jobs, tagged with their stage.
    pub fn failures(&self) -> impl Iterator<Item = (Stage, &AppError)> {
        self.reports
            .iter()
            .flat_map(|r| r.failures.iter().map(move |e| (r.stage, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.reports.iter().map(|r| r.failures.len()).sum::<usize>() + self.lost_workers.len()
    }

    fn stage_reports(&self, stage: Stage) -> impl Iterator<Item = &WorkerReport> {
        self.reports.iter().filter(move |r| r.stage == stage)
    }

    /// Write the summary to the log.
    pub fn log(&self) {
        log::info!(
            "Run summary: {} page(s), {} group(s), {} item(s), {} alert(s) queued, {} delivered, {} failure(s)",
            self.discovery.pages,
            self.processed(Stage::Group),
            self.processed(Stage::Item),
            self.alerts_queued(),
            self.alerts_delivered(),
            self.failure_count()
        );
        if let Some(e) = &self.discovery.error {
            log::warn!("Discovery ended early: {}", e);
        }
    }
}

/// Runs discovery and the three worker pools against shared services.
pub struct Orchestrator {
    state: RunState,
    fetcher: Arc<dyn JsonFetch>,
    notifier: Arc<dyn Notifier>,
    ledger: Arc<dyn SeenLedger>,
    endpoints: Arc<Endpoints>,
    matcher: Arc<KeywordMatcher>,
    workers: WorkerConfig,
    paginator: Paginator,
    group_page_limit: u32,
    notify_delay: DelayRange,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn JsonFetch>,
        notifier: Arc<dyn Notifier>,
        ledger: Arc<dyn SeenLedger>,
    ) -> Result<Self> {
        let scraper = &config.scraper;
        let matcher = KeywordMatcher::new(&config.keywords);
        log::debug!("Matching {} keyword(s)", matcher.len());
        Ok(Self {
            state: RunState::Idle,
            fetcher,
            notifier,
            ledger,
            endpoints: Arc::new(Endpoints::from_config(scraper)?),
            matcher: Arc::new(matcher),
            workers: config.workers.clone(),
            paginator: Paginator::new(scraper.initial_page_limit, scraper.page_limit),
            group_page_limit: scraper.group_page_limit,
            notify_delay: DelayRange::from_secs_f64(
                config.notifier.min_delay_secs,
                config.notifier.max_delay_secs,
            ),
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("Orchestrator: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run one scrape to completion and close the ledger.
    pub async fn run(&mut self) -> Result<RunSummary> {
        if self.state != RunState::Idle {
            return Err(AppError::validation(format!(
                "orchestrator cannot start from state {:?}",
                self.state
            )));
        }

        let (group_tx, group_rx) = work_queue::<GroupId>("groups");
        let (item_tx, item_rx) = work_queue::<Item>("items");
        let (alert_tx, alert_rx) = work_queue::<Alert>("alerts");

        self.transition(RunState::Discovering);
        let discovery =
            discover_groups(self.fetcher.as_ref(), &self.endpoints, self.paginator, &group_tx)
                .await?;

        self.transition(RunState::WorkersRunning);
        let group_stage = Arc::new(GroupStage::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.endpoints),
            self.group_page_limit,
            item_tx.clone(),
        ));
        let item_stage = Arc::new(ItemStage::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.endpoints),
            Arc::clone(&self.ledger),
            Arc::clone(&self.matcher),
            alert_tx.clone(),
        ));
        let notify_stage = Arc::new(NotifyStage::new(
            Arc::clone(&self.notifier),
            self.notify_delay,
        ));

        let group_pool = spawn_pool(Stage::Group, self.workers.group, group_rx, group_stage);
        let item_pool = spawn_pool(Stage::Item, self.workers.item, item_rx, item_stage);
        let notify_pool = spawn_pool(Stage::Notify, self.workers.notify, alert_rx, notify_stage);

        self.transition(RunState::Draining);
        let mut summary = RunSummary {
            discovery,
            ..RunSummary::default()
        };
        drain(&group_tx, self.workers.group, Stage::Group, group_pool, &mut summary).await;
        drain(&item_tx, self.workers.item, Stage::Item, item_pool, &mut summary).await;
        drain(&alert_tx, self.workers.notify, Stage::Notify, notify_pool, &mut summary).await;

        self.ledger.close().await;
        self.transition(RunState::Closed);

        summary.log();
        Ok(summary)
    }
}

/// Close a pool's queue and collect every worker's outcome.
async fn drain<T>(
    queue: &QueueSender<T>,
    workers: usize,
    stage: Stage,
    pool: Vec<JoinHandle<WorkerReport>>,
    summary: &mut RunSummary,
) {
    if let Err(e) = queue.close(workers) {
        // Only possible when every worker of the pool is already gone.
        log::warn!("Could not close '{}' queue: {}", queue.name(), e);
    }
    summary.closes_sent.insert(stage, queue.closes_sent());

    for outcome in join_all(pool).await {
        match outcome {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                log::error!("{} worker lost: {}", stage, e);
                summary.lost_workers.push(AppError::worker(stage, e));
            }
        }
    }
    log::debug!(
        "{} pool drained after {} job(s) on '{}'",
        stage,
        queue.jobs_pushed(),
        queue.name()
    );
}

/// Build the production services from configuration and run one scrape.
pub async fn run_scraper(config: &Config, credentials: Credentials) -> Result<RunSummary> {
    config.validate()?;

    let fetcher = Arc::new(RateLimitedFetcher::from_config(&config.scraper)?);
    let notifier = Arc::new(TelegramNotifier::new(
        create_async_client(&config.scraper)?,
        HeaderTemplate::from_config(&config.scraper)?,
        credentials,
        &config.notifier,
    ));
    let ledger = Arc::new(SqliteLedger::open(&config.ledger.path, config.ledger.retention()).await?);

    log::info!(
        "Scraping {}..{} with {} keyword(s)",
        config.scraper.min_price,
        config.scraper.max_price,
        config.keywords.len()
    );

    let mut orchestrator = Orchestrator::new(config, fetcher, notifier, ledger)?;
    orchestrator.run().await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FetchError;
    use crate::testing::{FakeFetcher, MemoryLedger, RecordingNotifier};
    use crate::utils::query_param;

    fn config(keywords: &[&str]) -> Config {
        let mut config = Config::default();
        config.keywords = keywords.iter().map(|k| k.to_string()).collect();
        config.scraper.api_base = "https://example.com/api/v2".into();
        config.notifier.min_delay_secs = 0.0;
        config.notifier.max_delay_secs = 0.0;
        config
    }

    fn inventory(url: &url::Url) -> std::result::Result<serde_json::Value, FetchError> {
        if url.path().ends_with("csgo-full-img") {
            return Ok(json!({"data": {"front": "https://img/x.png"}}));
        }
        Ok(match query_param(url, "groupId").as_deref() {
            Some("1") => json!({"items": [
                {"id": "a", "name": "AK-47", "stickers": [{"name": "Katowice 2014"}]},
                {"id": "b", "name": "M4A4", "stickers": [{"name": "Foil"}]},
            ]}),
            Some("2") => json!({"items": [
                {"id": "c", "name": "AWP", "stickers": [{"name": "katowice 2014 (holo)"}]},
                {"id": "a", "name": "AK-47", "stickers": [{"name": "Katowice 2014"}]},
            ]}),
            Some(_) => json!({"items": []}),
            None => match query_param(url, "offset").as_deref() {
                Some("0") => json!({"items": [{"id": "x", "groupId": 1}, {"id": "y", "groupId": 2}]}),
                _ => json!({"items": []}),
            },
        })
    }

    #[tokio::test]
    async fn full_run_alerts_each_match_once() {
        let notifier = Arc::new(RecordingNotifier::default());
        let ledger = Arc::new(MemoryLedger::default());
        let mut orchestrator = Orchestrator::new(
            &config(&["Katowice 2014"]),
            Arc::new(FakeFetcher::new(inventory)),
            notifier.clone(),
            ledger.clone(),
        )
        .unwrap();

        assert_eq!(orchestrator.state(), RunState::Idle);
        let summary = orchestrator.run().await.unwrap();
        assert_eq!(orchestrator.state(), RunState::Closed);

        assert_eq!(summary.discovery.groups, 2);
        assert_eq!(summary.processed(Stage::Group), 2);
        assert_eq!(summary.processed(Stage::Item), 4);
        assert_eq!(summary.alerts_queued(), 2);
        assert_eq!(summary.alerts_delivered(), 2);
        assert_eq!(summary.failure_count(), 0);
        assert_eq!(notifier.delivered.lock().unwrap().len(), 2);
        assert_eq!(ledger.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn every_worker_gets_a_report() {
        let mut config = config(&["Katowice"]);
        config.workers = WorkerConfig {
            group: 2,
            item: 5,
            notify: 3,
        };
        let mut orchestrator = Orchestrator::new(
            &config,
            Arc::new(FakeFetcher::new(inventory)),
            Arc::new(RecordingNotifier::default()),
            Arc::new(MemoryLedger::default()),
        )
        .unwrap();

        let summary = orchestrator.run().await.unwrap();
        let count = |stage| summary.reports.iter().filter(|r| r.stage == stage).count();
        assert_eq!(count(Stage::Group), 2);
        assert_eq!(count(Stage::Item), 5);
        assert_eq!(count(Stage::Notify), 3);
        assert!(summary.lost_workers.is_empty());

        // One close signal per worker of each pool.
        assert_eq!(summary.closes_sent[&Stage::Group], 2);
        assert_eq!(summary.closes_sent[&Stage::Item], 5);
        assert_eq!(summary.closes_sent[&Stage::Notify], 3);
    }

    #[tokio::test]
    async fn empty_listing_still_shuts_down() {
        let mut orchestrator = Orchestrator::new(
            &config(&["Katowice"]),
            Arc::new(FakeFetcher::new(|_| Ok(json!({"items": []})))),
            Arc::new(RecordingNotifier::default()),
            Arc::new(MemoryLedger::default()),
        )
        .unwrap();

        let summary = orchestrator.run().await.unwrap();
        assert_eq!(summary.discovery.pages, 1);
        assert_eq!(summary.discovery.groups, 0);
        assert_eq!(summary.alerts_delivered(), 0);
        assert_eq!(orchestrator.state(), RunState::Closed);
    }

    #[tokio::test]
    async fn run_twice_is_rejected() {
        let mut orchestrator = Orchestrator::new(
            &config(&["Katowice"]),
            Arc::new(FakeFetcher::new(|_| Ok(json!({"items": []})))),
            Arc::new(RecordingNotifier::default()),
            Arc::new(MemoryLedger::default()),
        )
        .unwrap();

        orchestrator.run().await.unwrap();
        assert!(orchestrator.run().await.is_err());
    }
}

//! Pipeline entry points for scraper runs.
//!
//! - `discover_groups`: Walk the paginated listing and queue group ids
//! - `Orchestrator`: Run the group, item and notify pools to completion
//! - `run_scraper`: Build production services from config and run once

pub mod discover;
pub mod orchestrator;
pub mod queue;
pub mod stages;

pub use discover::{DiscoveryReport, Paginator, discover_groups};
pub use orchestrator::{Orchestrator, RunState, RunSummary, run_scraper};
pub use queue::{Envelope, QueueReceiver, QueueSender, work_queue};
pub use stages::{
    GroupStage, ItemDecision, ItemStage, NotifyStage, Stage, StageWorker, WorkerReport, spawn_pool,
};

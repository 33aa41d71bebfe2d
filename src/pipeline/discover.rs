//! Listing discovery: walks the paginated inventory and queues group ids.

use crate::error::{FetchError, Result};
use crate::models::{GroupId, ListingPage};
use crate::pipeline::queue::QueueSender;
use crate::services::{JsonFetch, fetch_as};
use crate::utils::Endpoints;

/// Offset/limit sequence of the listing endpoint.
///
/// The first page is smaller than the rest, matching the site's own pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    offset: u64,
    limit: u32,
    steady_limit: u32,
}

impl Paginator {
    pub fn new(initial_limit: u32, steady_limit: u32) -> Self {
        Self {
            offset: 0,
            limit: initial_limit,
            steady_limit,
        }
    }

    /// `(offset, limit)` of the page to request next.
    pub fn current(&self) -> (u64, u32) {
        (self.offset, self.limit)
    }

    /// Move past the current page.
    pub fn advance(&mut self) {
        self.offset += u64::from(self.limit);
        self.limit = self.steady_limit;
    }
}

/// What a discovery walk produced.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Pages fetched, including the terminating empty one.
    pub pages: usize,
    /// Group ids queued (repeats included).
    pub groups: usize,
    /// Listing entries without a group id.
    pub skipped: usize,
    /// Set when a page fetch failed and the walk stopped early.
    pub error: Option<FetchError>,
}

/// Walk the listing until the first empty page, queueing every group id.
///
/// Ids are not deduplicated. A fetch error ends the walk; groups queued before
/// it are kept and the error is returned in the report.
pub async fn discover_groups(
    fetcher: &dyn JsonFetch,
    endpoints: &Endpoints,
    mut pages: Paginator,
    groups: &QueueSender<GroupId>,
) -> Result<DiscoveryReport> {
    let mut report = DiscoveryReport::default();

    loop {
        let (offset, limit) = pages.current();
        let url = endpoints.listing_page(offset, limit);

        let page: ListingPage = match fetch_as(fetcher, &url).await {
            Ok(page) => page,
            Err(e) => {
                log::error!("Discovery stopped at offset {}: {}", offset, e);
                report.error = Some(e);
                break;
            }
        };
        report.pages += 1;

        if page.items.is_empty() {
            log::debug!("Empty page at offset {}, discovery complete", offset);
            break;
        }

        log::debug!(
            "Listing page offset={} limit={}: {} entries",
            offset,
            limit,
            page.items.len()
        );
        for entry in page.items {
            match entry.group_id {
                Some(group) => {
                    groups.push(group)?;
                    report.groups += 1;
                }
                None => {
                    log::warn!(
                        "Listing entry {} has no groupId, skipped",
                        entry.id.as_deref().unwrap_or("<no id>")
                    );
                    report.skipped += 1;
                }
            }
        }

        pages.advance();
    }

    log::info!(
        "Discovered {} group(s) across {} page(s)",
        report.groups,
        report.pages
    );
    Ok(report)
}

//! Parallel detail fetches for a window of item ids.
//!
//! A load fans out one request per id, all started at once, and folds the
//! results into an id-keyed status table as they arrive in whatever order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use itertools::Itertools;
use pokeapi_client::types::CatalogItemDetail;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::pagination::PaginationCoordinator;
use crate::providers::cache::{CatalogCache, FetchError, FetchResult};

/// Upper bound of the catalog id range loaded in full mode.
pub const DEFAULT_CATALOG_SIZE: u64 = 1010;

/// Which ids a listing loads.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStrategy {
    /// One remote page at a time.
    #[default]
    #[display("paginated")]
    Paginated,
    /// The whole catalog, paginated locally after filtering.
    #[display("full")]
    Full,
}

#[derive(Debug, Clone)]
pub enum FetchStatus {
    Pending,
    Success(Arc<CatalogItemDetail>),
    Error(FetchError),
}

/// What a consumer renders for a load.
#[derive(Debug, Clone)]
pub enum AggregateOutcome {
    Loading,
    /// At least one item loaded. `failed` items are missing from `items`.
    Complete {
        items: Vec<Arc<CatalogItemDetail>>,
        failed: usize,
    },
    /// Every fetch failed.
    Failed { errors: usize, first: FetchError },
}

/// Status of every id of one load.
#[derive(Debug, Clone)]
pub struct AggregateState {
    ids: Vec<u32>,
    statuses: HashMap<u32, FetchStatus>,
    started_at: Instant,
    finished_at: Option<Instant>,
}

impl AggregateState {
    /// All ids pending. Duplicate ids are loaded once.
    pub fn new(ids: impl IntoIterator<Item = u32>) -> Self {
        let ids = ids.into_iter().unique().collect::<Vec<_>>();
        let statuses = ids.iter().map(|id| (*id, FetchStatus::Pending)).collect();
        let mut state = Self {
            ids,
            statuses,
            started_at: Instant::now(),
            finished_at: None,
        };
        if state.is_complete() {
            state.finished_at = Some(state.started_at);
        }
        state
    }

    /// The ids this load was derived from, in request order.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Whether this load belongs to the window `ids`.
    pub fn is_for(&self, ids: &[u32]) -> bool {
        self.ids == ids
    }

    pub fn status(&self, id: u32) -> Option<&FetchStatus> {
        self.statuses.get(&id)
    }

    /// Record the result for `id`. Results for ids outside the load are
    /// ignored.
    pub fn record(&mut self, id: u32, result: FetchResult<CatalogItemDetail>) {
        let Some(status) = self.statuses.get_mut(&id) else {
            return;
        };
        *status = match result {
            Ok(item) => FetchStatus::Success(item),
            Err(err) => {
                debug!(id, %err, "item failed to load");
                FetchStatus::Error(err)
            },
        };
        if self.finished_at.is_none() && self.is_complete() {
            self.finished_at = Some(Instant::now());
        }
    }

    pub fn success_count(&self) -> usize {
        self.count(|status| matches!(status, FetchStatus::Success(_)))
    }

    pub fn error_count(&self) -> usize {
        self.count(|status| matches!(status, FetchStatus::Error(_)))
    }

    pub fn pending_count(&self) -> usize {
        self.count(|status| matches!(status, FetchStatus::Pending))
    }

    pub fn is_complete(&self) -> bool {
        self.pending_count() == 0
    }

    /// Settled share of the load, 0 to 100.
    pub fn progress_percent(&self) -> u8 {
        if self.ids.is_empty() {
            return 100;
        }
        let settled = self.ids.len() - self.pending_count();
        (settled * 100 / self.ids.len()) as u8
    }

    /// Time since the load started, frozen once it completes.
    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started_at)
    }

    /// Successfully loaded items in request order.
    pub fn items(&self) -> Vec<Arc<CatalogItemDetail>> {
        self.ids
            .iter()
            .filter_map(|id| match self.statuses.get(id) {
                Some(FetchStatus::Success(item)) => Some(item.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn outcome(&self) -> AggregateOutcome {
        if !self.is_complete() {
            return AggregateOutcome::Loading;
        }

        let errors = self.error_count();
        let first_error = self.ids.iter().find_map(|id| match self.statuses.get(id) {
            Some(FetchStatus::Error(err)) => Some(err.clone()),
            _ => None,
        });

        match (self.success_count(), first_error) {
            (0, Some(first)) => AggregateOutcome::Failed { errors, first },
            _ => AggregateOutcome::Complete {
                items: self.items(),
                failed: errors,
            },
        }
    }

    fn count(&self, predicate: impl Fn(&FetchStatus) -> bool) -> usize {
        self.statuses.values().filter(|status| predicate(status)).count()
    }
}

/// The ids a listing shows and the size of the catalog they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub strategy: LoadStrategy,
    pub ids: Vec<u32>,
    pub total_count: u64,
}

/// Fans out detail fetches through the shared cache.
#[derive(Debug, Clone)]
pub struct AggregateLoader {
    cache: CatalogCache,
}

impl AggregateLoader {
    pub fn new(cache: CatalogCache) -> Self {
        Self { cache }
    }

    /// Load every id at once, calling `on_progress` after each settles.
    #[instrument(skip_all, fields(n_ids = ids.len()))]
    pub async fn load(
        &self,
        ids: Vec<u32>,
        mut on_progress: impl FnMut(&AggregateState),
    ) -> AggregateState {
        let mut state = AggregateState::new(ids);

        let mut in_flight = state
            .ids()
            .iter()
            .map(|&id| {
                let cache = self.cache.clone();
                async move { (id, cache.item(id).await) }
            })
            .collect::<FuturesUnordered<_>>();

        while let Some((id, result)) = in_flight.next().await {
            state.record(id, result);
            on_progress(&state);
        }

        debug!(
            success = state.success_count(),
            errors = state.error_count(),
            elapsed_ms = state.elapsed().as_millis() as u64,
            "aggregate load complete"
        );
        state
    }

    /// Ids of the current remote page.
    #[instrument(skip_all, fields(page = pages.current_page()))]
    pub async fn paginated_window(
        &self,
        pages: &PaginationCoordinator,
    ) -> Result<Window, FetchError> {
        let page = self
            .cache
            .list_page(pages.offset(), pages.page_size())
            .await?;

        let ids = page
            .items
            .iter()
            .filter_map(|summary| match summary.id() {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(name = %summary.name, %err, "skipping list entry");
                    None
                },
            })
            .collect();

        Ok(Window {
            strategy: LoadStrategy::Paginated,
            ids,
            total_count: page.total_count,
        })
    }

    /// Ids `1..=n`, with `n` the configured catalog size clamped to the
    /// remote item count.
    ///
    /// The remote count is read from the first page of `page_size` items,
    /// which is usually cached already.
    #[instrument(skip(self))]
    pub async fn full_window(
        &self,
        catalog_size: u64,
        page_size: u64,
    ) -> Result<Window, FetchError> {
        let first_page = self.cache.list_page(0, page_size.max(1)).await?;
        let n = catalog_size.min(first_page.total_count);
        let n = u32::try_from(n).unwrap_or(u32::MAX);

        Ok(Window {
            strategy: LoadStrategy::Full,
            ids: (1..=n).collect(),
            total_count: u64::from(n),
        })
    }
}

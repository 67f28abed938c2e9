//! A browsing session wired to the catalog.
//!
//! [`Browser`] owns the [`Session`] and the loads derived from it. Every
//! call to [`Browser::view`] re-derives what to show from the current
//! session, so a load for a window that is no longer current never shows up.

use std::sync::Arc;
use std::time::Duration;

use pokeapi_client::types::{CatalogItemDetail, ItemRef};
use tracing::{debug, instrument};

use super::aggregate::{
    AggregateLoader, AggregateOutcome, AggregateState, LoadStrategy, Window,
};
use super::evolution::{EvolutionData, EvolutionError, EvolutionResolver};
use super::query;
use super::session::{Session, SessionCommand, SessionUpdate};
use crate::providers::cache::{CatalogCache, FetchError};

/// What the listing shows right now.
#[derive(Debug, Clone)]
pub enum ListingView {
    Loading {
        progress_percent: u8,
        elapsed: Duration,
    },
    Failed {
        message: String,
    },
    /// Nothing to show. `searched` tells an empty filter result apart from
    /// an empty catalog.
    Empty {
        searched: bool,
    },
    Ready {
        items: Vec<Arc<CatalogItemDetail>>,
        /// Items of the window that failed to load.
        failed: usize,
        page: u64,
        total_pages: u64,
        /// Items across all pages.
        total_items: u64,
    },
}

/// Result of addressing a single item.
#[derive(Debug, Clone)]
pub enum DetailLookup {
    Found(Arc<CatalogItemDetail>),
    NotFound(ItemRef),
    Failed(FetchError),
}

/// Session parameters a window was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowSource {
    Remote { offset: u64, page_size: u64 },
    Full,
}

impl WindowSource {
    fn of(session: &Session) -> Self {
        match session.load_strategy() {
            LoadStrategy::Paginated => WindowSource::Remote {
                offset: session.remote_pages().offset(),
                page_size: session.remote_pages().page_size(),
            },
            LoadStrategy::Full => WindowSource::Full,
        }
    }
}

#[derive(Debug)]
pub struct Browser {
    cache: CatalogCache,
    loader: AggregateLoader,
    resolver: EvolutionResolver,
    session: Session,
    catalog_size: u64,
    window: Option<(WindowSource, Window)>,
    window_error: Option<(WindowSource, FetchError)>,
    load: Option<AggregateState>,
}

impl Browser {
    pub fn new(cache: CatalogCache, session: Session, catalog_size: u64) -> Self {
        Self {
            loader: AggregateLoader::new(cache.clone()),
            resolver: EvolutionResolver::new(cache.clone()),
            cache,
            session,
            catalog_size,
            window: None,
            window_error: None,
            load: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> SessionUpdate {
        let update = self.session.dispatch(command);
        if update.changed {
            self.sync_local_total();
        }
        update
    }

    /// Derive the window for the current session and load it, unless it
    /// was loaded completely before.
    #[instrument(skip_all, fields(strategy = %self.session.load_strategy()))]
    pub async fn refresh(&mut self, on_progress: impl FnMut(&AggregateState)) {
        let window = self.current_window().await;
        // Deriving a paginated window may move back to page 1
        let source = WindowSource::of(&self.session);
        let window = match window {
            Ok(window) => window,
            Err(err) => {
                debug!(%err, "failed to derive window");
                self.window = None;
                self.window_error = Some((source, err));
                return;
            },
        };
        self.window_error = None;

        let loaded = self
            .load
            .as_ref()
            .is_some_and(|load| load.is_for(&window.ids) && load.is_complete());
        if !loaded {
            self.load = Some(self.loader.load(window.ids.clone(), on_progress).await);
        }
        self.window = Some((source, window));
        self.sync_local_total();
    }

    /// The stored window, if it was derived from the current session.
    fn current_window_state(&self) -> Option<&Window> {
        self.window
            .as_ref()
            .filter(|(source, _)| *source == WindowSource::of(&self.session))
            .map(|(_, window)| window)
    }

    async fn current_window(&mut self) -> Result<Window, FetchError> {
        match self.session.load_strategy() {
            LoadStrategy::Paginated => {
                let window = self
                    .loader
                    .paginated_window(self.session.remote_pages())
                    .await?;
                let update = self
                    .session
                    .dispatch(SessionCommand::SetRemoteTotal(window.total_count));
                if update.window_changed {
                    // The current page no longer exists, reload page 1
                    return self
                        .loader
                        .paginated_window(self.session.remote_pages())
                        .await;
                }
                Ok(window)
            },
            LoadStrategy::Full => {
                let page_size = self.session.remote_pages().page_size();
                self.loader.full_window(self.catalog_size, page_size).await
            },
        }
    }

    /// Local pages always count the filtered result of the current load.
    fn sync_local_total(&mut self) {
        if self.session.load_strategy() != LoadStrategy::Full {
            return;
        }
        if let Some(items) = self.current_items() {
            let filtered = query::apply(&items, self.session.filters());
            self.session
                .dispatch(SessionCommand::SetLocalTotal(filtered.len() as u64));
        }
    }

    /// Items loaded for the current window, if its load is complete.
    fn current_items(&self) -> Option<Vec<Arc<CatalogItemDetail>>> {
        let window = self.current_window_state()?;
        let load = self.load.as_ref().filter(|load| load.is_for(&window.ids))?;
        match load.outcome() {
            AggregateOutcome::Complete { items, .. } => Some(items),
            _ => None,
        }
    }

    /// What to show for the current session.
    pub fn view(&self) -> ListingView {
        if let Some((source, err)) = &self.window_error {
            if *source == WindowSource::of(&self.session) {
                return ListingView::Failed {
                    message: err.to_string(),
                };
            }
        }

        let Some(window) = self.current_window_state() else {
            return ListingView::Loading {
                progress_percent: 0,
                elapsed: Duration::ZERO,
            };
        };
        let Some(load) = self.load.as_ref().filter(|load| load.is_for(&window.ids)) else {
            return ListingView::Loading {
                progress_percent: 0,
                elapsed: Duration::ZERO,
            };
        };

        let (items, failed) = match load.outcome() {
            AggregateOutcome::Loading => {
                return ListingView::Loading {
                    progress_percent: load.progress_percent(),
                    elapsed: load.elapsed(),
                };
            },
            AggregateOutcome::Failed { errors, first } => {
                return ListingView::Failed {
                    message: format!("all {errors} items failed to load: {first}"),
                };
            },
            AggregateOutcome::Complete { items, failed } => (items, failed),
        };

        let filters = self.session.filters();
        let filtered = query::apply(&items, filters);
        if filtered.is_empty() {
            return ListingView::Empty {
                searched: !filters.is_unfiltered(),
            };
        }

        match self.session.load_strategy() {
            LoadStrategy::Paginated => {
                let pages = self.session.remote_pages();
                ListingView::Ready {
                    items: filtered,
                    failed,
                    page: pages.current_page(),
                    total_pages: pages.total_pages(),
                    total_items: pages.total_items(),
                }
            },
            LoadStrategy::Full => {
                let pages = self.session.local_pages();
                ListingView::Ready {
                    items: query::paginate(&filtered, pages),
                    failed,
                    page: pages.current_page(),
                    total_pages: pages.total_pages(),
                    total_items: filtered.len() as u64,
                }
            },
        }
    }

    /// Look up a single item by id or name.
    pub async fn lookup(&self, item: &ItemRef) -> DetailLookup {
        match self.cache.lookup(item).await {
            Ok(detail) => DetailLookup::Found(detail),
            Err(err) if err.is_not_found() => DetailLookup::NotFound(item.clone()),
            Err(err) => DetailLookup::Failed(err),
        }
    }

    /// Evolution data for an already fetched item.
    pub async fn evolution(
        &self,
        item: &CatalogItemDetail,
    ) -> Result<EvolutionData, EvolutionError> {
        self.resolver
            .resolve_or_unavailable(&item.species_reference_url)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pokeapi_client::{Client, MockCatalog, MockRequest};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::query::FilterCommand;
    use crate::models::session::ViewMode;
    use crate::test_helpers::*;

    fn catalog(n: u32) -> Vec<CatalogItemDetail> {
        (1..=n)
            .map(|id| {
                let kind = if id % 2 == 0 { "water" } else { "fire" };
                typed_item(id, &format!("mon-{id:03}"), &[kind])
            })
            .collect()
    }

    fn browser(
        items: Vec<CatalogItemDetail>,
        strategy: LoadStrategy,
    ) -> (Browser, pokeapi_client::MockClient) {
        let (cache, mock) = mock_cache(items);
        let session = Session::new(20, strategy, ViewMode::Grid);
        (Browser::new(cache, session, 1010), mock)
    }

    fn ready_ids(view: &ListingView) -> Vec<u32> {
        match view {
            ListingView::Ready { items, .. } => items.iter().map(|item| item.id).collect(),
            other => panic!("expected a ready view, found {other:?}"),
        }
    }

    #[tokio::test]
    async fn loading_before_first_refresh() {
        let (browser, _mock) = browser(catalog(3), LoadStrategy::Paginated);
        assert!(matches!(browser.view(), ListingView::Loading { .. }));
    }

    #[tokio::test]
    async fn paginated_mode_shows_remote_page() {
        let (mut browser, _mock) = browser(catalog(45), LoadStrategy::Paginated);

        browser.refresh(|_| {}).await;
        assert_eq!(ready_ids(&browser.view()), (1..=20).collect::<Vec<_>>());

        assert!(browser.dispatch(SessionCommand::NextPage).window_changed);
        browser.refresh(|_| {}).await;

        let view = browser.view();
        assert_eq!(ready_ids(&view), (21..=40).collect::<Vec<_>>());
        assert!(matches!(view, ListingView::Ready {
            page: 2,
            total_pages: 3,
            total_items: 45,
            ..
        }));
    }

    #[tokio::test]
    async fn page_change_is_loading_until_refreshed() {
        let (mut browser, _mock) = browser(catalog(45), LoadStrategy::Paginated);
        browser.refresh(|_| {}).await;

        assert!(browser.dispatch(SessionCommand::NextPage).window_changed);
        assert!(matches!(browser.view(), ListingView::Loading { .. }));

        browser.dispatch(SessionCommand::PrevPage);
        assert_eq!(ready_ids(&browser.view()), (1..=20).collect::<Vec<_>>());

        browser.dispatch(SessionCommand::GoToPage(3));
        assert!(matches!(browser.view(), ListingView::Loading { .. }));

        browser.refresh(|_| {}).await;
        assert_eq!(ready_ids(&browser.view()), (41..=45).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn strategy_switch_is_loading_until_refreshed() {
        let (mut browser, _mock) = browser(catalog(45), LoadStrategy::Paginated);
        browser.refresh(|_| {}).await;

        browser.dispatch(SessionCommand::SetLoadStrategy(LoadStrategy::Full));
        assert!(matches!(browser.view(), ListingView::Loading { .. }));

        browser.refresh(|_| {}).await;
        let view = browser.view();
        assert!(matches!(view, ListingView::Ready {
            total_pages: 3,
            total_items: 45,
            ..
        }));
        assert_eq!(ready_ids(&view), (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn paginated_mode_filters_current_page() {
        let (mut browser, _mock) = browser(catalog(45), LoadStrategy::Paginated);
        browser.refresh(|_| {}).await;

        browser.dispatch(SessionCommand::Filter(FilterCommand::ToggleType(
            "water".to_string(),
        )));

        let ids = ready_ids(&browser.view());
        assert_eq!(ids.len(), 10);
        assert!(ids.iter().all(|id| id % 2 == 0));
    }

    #[tokio::test]
    async fn full_mode_filters_then_paginates_locally() {
        let (mut browser, _mock) = browser(catalog(60), LoadStrategy::Full);
        browser.refresh(|_| {}).await;

        assert!(matches!(browser.view(), ListingView::Ready {
            total_pages: 3,
            total_items: 60,
            ..
        }));

        browser.dispatch(SessionCommand::GoToPage(3));
        assert_eq!(browser.session().pages().current_page(), 3);

        browser.dispatch(SessionCommand::Filter(FilterCommand::ToggleType(
            "fire".to_string(),
        )));
        assert_eq!(browser.session().pages().current_page(), 1);

        let view = browser.view();
        assert!(matches!(view, ListingView::Ready {
            page: 1,
            total_pages: 2,
            total_items: 30,
            ..
        }));
        assert_eq!(ready_ids(&view).first(), Some(&1));
    }

    #[tokio::test]
    async fn switching_back_to_paginated_reuses_cached_items() {
        let (mut browser, mock) = browser(catalog(30), LoadStrategy::Full);
        browser.refresh(|_| {}).await;

        browser.dispatch(SessionCommand::SetLoadStrategy(LoadStrategy::Paginated));
        browser.refresh(|_| {}).await;

        assert_eq!(ready_ids(&browser.view()).len(), 20);
        for id in 1..=30 {
            assert_eq!(mock.count(&MockRequest::ItemById(id)), 1, "item {id}");
        }
    }

    #[tokio::test]
    async fn empty_search_is_distinct_from_failure() {
        let (mut browser, _mock) = browser(catalog(5), LoadStrategy::Paginated);
        browser.refresh(|_| {}).await;

        browser.dispatch(SessionCommand::Filter(FilterCommand::SetSearchQuery(
            "missingno".to_string(),
        )));

        assert!(matches!(browser.view(), ListingView::Empty { searched: true }));
    }

    #[tokio::test]
    async fn partial_failure_is_reported_with_items() {
        let (mut browser, mock) = browser(catalog(5), LoadStrategy::Paginated);
        mock.fail_item(3);
        browser.refresh(|_| {}).await;

        let view = browser.view();
        assert_eq!(ready_ids(&view), vec![1, 2, 4, 5]);
        assert!(matches!(view, ListingView::Ready { failed: 1, .. }));
    }

    #[tokio::test]
    async fn total_failure_blocks_the_view() {
        let (mut browser, mock) = browser(catalog(2), LoadStrategy::Paginated);
        mock.fail_item(1);
        mock.fail_item(2);
        browser.refresh(|_| {}).await;

        assert!(matches!(browser.view(), ListingView::Failed { .. }));
    }

    #[tokio::test]
    async fn list_failure_blocks_the_view() {
        let mock = mock_client(MockCatalog {
            items: catalog(3),
            list_unavailable: true,
            ..Default::default()
        });
        let mut browser = Browser::new(
            CatalogCache::new(Client::Mock(mock)),
            Session::new(20, LoadStrategy::Paginated, ViewMode::Grid),
            1010,
        );
        browser.refresh(|_| {}).await;

        assert!(matches!(browser.view(), ListingView::Failed { .. }));
    }

    #[tokio::test]
    async fn empty_catalog_is_not_a_search_result() {
        let (mut browser, _mock) = browser(vec![], LoadStrategy::Paginated);
        browser.refresh(|_| {}).await;

        assert!(matches!(browser.view(), ListingView::Empty { searched: false }));
    }

    #[tokio::test]
    async fn lookup_distinguishes_not_found() {
        let (browser, mock) = browser(catalog(3), LoadStrategy::Paginated);
        mock.fail_item(2);

        assert!(matches!(
            browser.lookup(&ItemRef::Name("MON-001".to_string())).await,
            DetailLookup::Found(item) if item.id == 1
        ));
        assert!(matches!(
            browser.lookup(&ItemRef::Id(404)).await,
            DetailLookup::NotFound(ItemRef::Id(404))
        ));
        assert!(matches!(
            browser.lookup(&ItemRef::Id(2)).await,
            DetailLookup::Failed(_)
        ));
    }

    #[tokio::test]
    async fn evolution_for_fetched_item() {
        let mock = mock_client(MockCatalog {
            items: vec![item(1, "bulbasaur")],
            species: BTreeMap::from([(1, species("bulbasaur", 1))]),
            evolution_chains: BTreeMap::from([(1, bulbasaur_chain())]),
            ..Default::default()
        });
        let browser = Browser::new(
            CatalogCache::new(Client::Mock(mock)),
            Session::new(20, LoadStrategy::Paginated, ViewMode::Grid),
            1010,
        );

        let DetailLookup::Found(item) = browser.lookup(&ItemRef::Id(1)).await else {
            panic!("expected bulbasaur");
        };
        let EvolutionData::Paths(paths) = browser.evolution(&item).await.unwrap() else {
            panic!("expected evolution paths");
        };
        assert_eq!(paths[0].len(), 3);
    }
}

//! Shared, id-keyed cache in front of the catalog client.
//!
//! Every consumer (listing, detail lookups, the evolution resolver and the
//! aggregate loader) reads through one [`CatalogCache`].
//! A request for a key that is already in flight attaches to the pending
//! request instead of issuing a second network call.
//! Failed requests are never cached.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use pokeapi_client::types::{
    CatalogItemDetail, EvolutionNode, ItemListPage, ItemRef, SpeciesInfo, TypeSummary,
};
use pokeapi_client::{CatalogClientError, Client, ClientTrait};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Freshness window of a cache entry class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Aggregate views such as list pages.
    Default,
    /// Item detail records.
    Extended,
    /// Reference data that never changes upstream.
    Infinite,
}

impl CachePolicy {
    pub fn stale_after(&self) -> Option<Duration> {
        match self {
            CachePolicy::Default => Some(Duration::from_secs(5 * 60)),
            CachePolicy::Extended => Some(Duration::from_secs(10 * 60)),
            CachePolicy::Infinite => None,
        }
    }

    fn is_fresh(&self, fetched_at: Instant, now: Instant) -> bool {
        match self.stale_after() {
            Some(window) => now.saturating_duration_since(fetched_at) < window,
            None => true,
        }
    }
}

/// A catalog failure as seen through the cache.
///
/// Cloneable so that every caller attached to the same in-flight request
/// receives the error.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct FetchError(Arc<CatalogClientError>);

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        self.0.is_not_found()
    }

    pub fn is_invalid_reference(&self) -> bool {
        matches!(*self.0, CatalogClientError::InvalidReference(_))
    }

    pub fn inner(&self) -> &CatalogClientError {
        &self.0
    }
}

impl From<CatalogClientError> for FetchError {
    fn from(err: CatalogClientError) -> Self {
        FetchError(Arc::new(err))
    }
}

pub type FetchResult<V> = Result<Arc<V>, FetchError>;

type SharedFetch<V> = Shared<LocalBoxFuture<'static, FetchResult<V>>>;

struct Entry<V> {
    value: Arc<V>,
    fetched_at: Instant,
}

/// Entries and in-flight requests of one entry class.
struct Keyed<K, V> {
    policy: CachePolicy,
    entries: HashMap<K, Entry<V>>,
    in_flight: HashMap<K, SharedFetch<V>>,
}

impl<K: Eq + Hash, V> Keyed<K, V> {
    fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            in_flight: HashMap::new(),
        }
    }

    fn fresh(&self, key: &K, now: Instant) -> Option<Arc<V>> {
        self.entries
            .get(key)
            .filter(|entry| self.policy.is_fresh(entry.fetched_at, now))
            .map(|entry| entry.value.clone())
    }
}

struct CacheInner {
    client: Arc<Client>,
    items: Mutex<Keyed<u32, CatalogItemDetail>>,
    items_by_name: Mutex<Keyed<String, CatalogItemDetail>>,
    pages: Mutex<Keyed<(u64, u64), ItemListPage>>,
    species: Mutex<Keyed<u32, SpeciesInfo>>,
    chains: Mutex<Keyed<u32, EvolutionNode>>,
    types: Mutex<Keyed<(), Vec<TypeSummary>>>,
}

/// Cheaply cloneable handle to the shared catalog cache.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Arc<CacheInner>,
}

impl Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("client", &self.inner.client)
            .finish_non_exhaustive()
    }
}

impl CatalogCache {
    pub fn new(client: Client) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                client: Arc::new(client),
                items: Mutex::new(Keyed::new(CachePolicy::Extended)),
                items_by_name: Mutex::new(Keyed::new(CachePolicy::Extended)),
                pages: Mutex::new(Keyed::new(CachePolicy::Default)),
                species: Mutex::new(Keyed::new(CachePolicy::Infinite)),
                chains: Mutex::new(Keyed::new(CachePolicy::Infinite)),
                types: Mutex::new(Keyed::new(CachePolicy::Infinite)),
            }),
        }
    }

    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// Item detail by id.
    #[instrument(skip(self))]
    pub async fn item(&self, id: u32) -> FetchResult<CatalogItemDetail> {
        let client = self.inner.client.clone();
        get_or_fetch(&self.inner.items, id, move || async move {
            client.get_item_by_id(id).await
        })
        .await
    }

    /// Item detail by case-insensitive name.
    ///
    /// Resolves through the id-keyed entries when the name was seen before,
    /// and records fetched records under their id.
    #[instrument(skip(self))]
    pub async fn item_by_name(&self, name: &str) -> FetchResult<CatalogItemDetail> {
        let name = name.trim().to_lowercase();

        let known_id = self
            .inner
            .items
            .lock()
            .expect("cache lock poisoned")
            .entries
            .iter()
            .find(|(_, entry)| entry.value.name == name)
            .map(|(id, _)| *id);
        if let Some(id) = known_id {
            debug!(name, id, "resolved name through id cache");
            return self.item(id).await;
        }

        let client = self.inner.client.clone();
        let key = name.clone();
        let item = get_or_fetch(&self.inner.items_by_name, key, move || async move {
            client.get_item_by_name(&name).await
        })
        .await?;

        let mut items = self.inner.items.lock().expect("cache lock poisoned");
        items.entries.entry(item.id).or_insert_with(|| Entry {
            value: item.clone(),
            fetched_at: Instant::now(),
        });
        Ok(item)
    }

    /// Item detail addressed by id or name.
    pub async fn lookup(&self, item: &ItemRef) -> FetchResult<CatalogItemDetail> {
        match item {
            ItemRef::Id(id) => self.item(*id).await,
            ItemRef::Name(name) => self.item_by_name(name).await,
        }
    }

    /// Read an item record without fetching, fresh or not.
    pub fn peek_item(&self, id: u32) -> Option<Arc<CatalogItemDetail>> {
        self.inner
            .items
            .lock()
            .expect("cache lock poisoned")
            .entries
            .get(&id)
            .map(|entry| entry.value.clone())
    }

    /// One page of the item list.
    #[instrument(skip(self))]
    pub async fn list_page(&self, offset: u64, limit: u64) -> FetchResult<ItemListPage> {
        let client = self.inner.client.clone();
        get_or_fetch(&self.inner.pages, (offset, limit), move || async move {
            client.list_items(offset, limit).await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn species(&self, id: u32) -> FetchResult<SpeciesInfo> {
        let client = self.inner.client.clone();
        get_or_fetch(&self.inner.species, id, move || async move {
            client.get_species_by_id(id).await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn evolution_chain(&self, id: u32) -> FetchResult<EvolutionNode> {
        let client = self.inner.client.clone();
        get_or_fetch(&self.inner.chains, id, move || async move {
            client.get_evolution_chain_by_id(id).await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn types(&self) -> FetchResult<Vec<TypeSummary>> {
        let client = self.inner.client.clone();
        get_or_fetch(&self.inner.types, (), move || async move {
            client.list_types().await
        })
        .await
    }
}

/// Serve `key` from `store` if fresh, attach to an in-flight request for
/// it, or start a new request with `fetch`.
async fn get_or_fetch<K, V, F, Fut>(store: &Mutex<Keyed<K, V>>, key: K, fetch: F) -> FetchResult<V>
where
    K: Eq + Hash + Clone + Debug,
    V: 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, CatalogClientError>> + 'static,
{
    let pending = {
        let mut keyed = store.lock().expect("cache lock poisoned");
        if let Some(value) = keyed.fresh(&key, Instant::now()) {
            return Ok(value);
        }
        match keyed.in_flight.get(&key) {
            Some(pending) => {
                debug!(?key, "attaching to in-flight request");
                pending.clone()
            },
            None => {
                let pending = fetch()
                    .map(|result| result.map(Arc::new).map_err(FetchError::from))
                    .boxed_local()
                    .shared();
                keyed.in_flight.insert(key.clone(), pending.clone());
                pending
            },
        }
    };

    let result = pending.clone().await;

    let mut keyed = store.lock().expect("cache lock poisoned");
    let owns_request = keyed
        .in_flight
        .get(&key)
        .is_some_and(|current| current.ptr_eq(&pending));
    if owns_request {
        keyed.in_flight.remove(&key);
        if let Ok(value) = &result {
            keyed.entries.insert(key, Entry {
                value: value.clone(),
                fetched_at: Instant::now(),
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pokeapi_client::{MockCatalog, MockClient, MockRequest};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_helpers::{item, mock_cache};

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_share_one_fetch() {
        let mock = MockClient::from_catalog(MockCatalog {
            items: vec![item(1, "bulbasaur")],
            ..Default::default()
        })
        .with_latency(Duration::from_millis(50));
        let cache = CatalogCache::new(Client::Mock(mock.clone()));

        let (first, second) = futures::join!(cache.item(1), cache.item(1));

        assert_eq!(first.unwrap().name, "bulbasaur");
        assert_eq!(second.unwrap().name, "bulbasaur");
        assert_eq!(mock.count(&MockRequest::ItemById(1)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn items_go_stale_after_ten_minutes() {
        let (cache, mock) = mock_cache(vec![item(1, "bulbasaur")]);

        cache.item(1).await.unwrap();
        tokio::time::advance(Duration::from_secs(9 * 60)).await;
        cache.item(1).await.unwrap();
        assert_eq!(mock.count(&MockRequest::ItemById(1)), 1);

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        cache.item(1).await.unwrap();
        assert_eq!(mock.count(&MockRequest::ItemById(1)), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn list_pages_go_stale_after_five_minutes() {
        let (cache, mock) = mock_cache(vec![item(1, "bulbasaur")]);
        let request = MockRequest::ListItems {
            offset: 0,
            limit: 20,
        };

        cache.list_page(0, 20).await.unwrap();
        cache.list_page(0, 20).await.unwrap();
        assert_eq!(mock.count(&request), 1);

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        cache.list_page(0, 20).await.unwrap();
        assert_eq!(mock.count(&request), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reference_data_never_goes_stale() {
        let (cache, mock) = mock_cache(vec![]);

        cache.types().await.unwrap();
        tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
        cache.types().await.unwrap();

        assert_eq!(mock.count(&MockRequest::Types), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let (cache, mock) = mock_cache(vec![]);

        assert!(cache.item(7).await.unwrap_err().is_not_found());
        mock.push_item(item(7, "squirtle"));

        assert_eq!(cache.item(7).await.unwrap().name, "squirtle");
        assert_eq!(mock.count(&MockRequest::ItemById(7)), 2);
    }

    #[tokio::test]
    async fn name_lookup_populates_and_reuses_id_entry() {
        let (cache, mock) = mock_cache(vec![item(25, "pikachu")]);

        let by_name = cache.item_by_name("Pikachu").await.unwrap();
        assert_eq!(by_name.id, 25);
        assert!(cache.peek_item(25).is_some());

        cache.item(25).await.unwrap();
        assert_eq!(mock.count(&MockRequest::ItemById(25)), 0);

        let again = cache.item_by_name("PIKACHU").await.unwrap();
        assert_eq!(again.id, 25);
        assert_eq!(
            mock.count(&MockRequest::ItemByName("pikachu".to_string())),
            1
        );
    }

    #[tokio::test]
    async fn id_lookup_serves_later_name_lookup() {
        let (cache, mock) = mock_cache(vec![item(4, "charmander")]);

        cache.lookup(&ItemRef::Id(4)).await.unwrap();
        cache
            .lookup(&ItemRef::Name("charmander".to_string()))
            .await
            .unwrap();

        assert_eq!(mock.recorded_requests(), vec![MockRequest::ItemById(4)]);
    }

    #[test]
    fn peek_does_not_fetch() {
        let (cache, mock) = mock_cache(vec![item(1, "bulbasaur")]);
        assert!(cache.peek_item(1).is_none());
        assert!(mock.recorded_requests().is_empty());
    }
}

//! In-memory catalog used by tests and by the binary when
//! [`POKEDEX_CATALOG_MOCK_DATA_VAR`] points at a JSON file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientTrait;
use crate::error::{CatalogClientError, Resource};
use crate::types::*;

pub const POKEDEX_CATALOG_MOCK_DATA_VAR: &str = "_POKEDEX_USE_CATALOG_MOCK";

const MOCK_REFERENCE_BASE: &str = "https://pokeapi.co/api/v2";

// Arc allows seeding the client from outside after it was handed out
// Mutex allows sharing across threads
type MockField<T> = Arc<Mutex<T>>;

/// The data a [`MockClient`] serves.
///
/// Maps are keyed by id, so the order in which requests arrive does not
/// matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockCatalog {
    #[serde(default)]
    pub items: Vec<CatalogItemDetail>,
    #[serde(default)]
    pub species: BTreeMap<u32, SpeciesInfo>,
    #[serde(default)]
    pub evolution_chains: BTreeMap<u32, EvolutionNode>,
    #[serde(default)]
    pub types: Vec<TypeSummary>,
    /// Reported list size, defaults to the number of seeded items.
    #[serde(default)]
    pub total_count: Option<u64>,
    /// Item ids whose detail requests fail with a server error.
    #[serde(default)]
    pub failing_ids: BTreeSet<u32>,
    /// Make list requests fail with a server error.
    #[serde(default)]
    pub list_unavailable: bool,
}

/// A request observed by a [`MockClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRequest {
    ListItems { offset: u64, limit: u64 },
    ItemById(u32),
    ItemByName(String),
    Species(u32),
    EvolutionChain(u32),
    Types,
}

#[derive(Debug, Error)]
pub enum MockDataError {
    /// Failed to read the JSON file pointed at by the _POKEDEX_USE_CATALOG_MOCK var
    #[error("failed to read mock catalog file")]
    ReadMockFile(#[source] std::io::Error),
    /// Failed to parse the contents of the mock data file as JSON
    #[error("failed to parse mock catalog as JSON")]
    ParseJson(#[source] serde_json::Error),
}

/// Reads a mock catalog from disk.
fn read_mock_catalog(path: impl AsRef<Path>) -> Result<MockCatalog, MockDataError> {
    let contents = std::fs::read_to_string(path).map_err(MockDataError::ReadMockFile)?;
    serde_json::from_str(&contents).map_err(MockDataError::ParseJson)
}

/// A catalog client that answers from a seeded [`MockCatalog`] and
/// records every request it receives.
#[derive(Debug, Default, Clone)]
pub struct MockClient {
    pub catalog: MockField<MockCatalog>,
    pub requests: MockField<Vec<MockRequest>>,
    latency: Option<Duration>,
}

impl MockClient {
    /// Create a new mock client, potentially reading the catalog from disk
    pub fn new(mock_data_path: Option<impl AsRef<Path>>) -> Result<Self, MockDataError> {
        let catalog = match mock_data_path {
            Some(path) => read_mock_catalog(path)?,
            None => MockCatalog::default(),
        };
        Ok(Self::from_catalog(catalog))
    }

    pub fn from_catalog(catalog: MockCatalog) -> Self {
        Self {
            catalog: Arc::new(Mutex::new(catalog)),
            requests: Default::default(),
            latency: None,
        }
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add or replace an item record.
    pub fn push_item(&self, item: CatalogItemDetail) {
        let mut catalog = self.catalog.lock().expect("couldn't acquire mock lock");
        catalog.items.retain(|existing| existing.id != item.id);
        catalog.items.push(item);
    }

    /// Make detail requests for `id` fail with a server error.
    pub fn fail_item(&self, id: u32) {
        self.catalog
            .lock()
            .expect("couldn't acquire mock lock")
            .failing_ids
            .insert(id);
    }

    /// All requests seen so far, in arrival order.
    pub fn recorded_requests(&self) -> Vec<MockRequest> {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    /// Number of recorded requests equal to `request`.
    pub fn count(&self, request: &MockRequest) -> usize {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .iter()
            .filter(|seen| *seen == request)
            .count()
    }

    async fn record(&self, request: MockRequest) {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .push(request);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn lookup_item(
        &self,
        key: &str,
        matches: impl Fn(&CatalogItemDetail) -> bool,
    ) -> Result<CatalogItemDetail, CatalogClientError> {
        let catalog = self.catalog.lock().expect("couldn't acquire mock lock");
        let item = catalog
            .items
            .iter()
            .find(|item| matches(item))
            .ok_or_else(|| CatalogClientError::NotFound {
                resource: Resource::Item,
                key: key.to_string(),
            })?;
        if catalog.failing_ids.contains(&item.id) {
            return Err(CatalogClientError::UnexpectedStatus {
                resource: Resource::Item,
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        Ok(item.clone())
    }
}

impl ClientTrait for MockClient {
    async fn list_items(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<ItemListPage, CatalogClientError> {
        self.record(MockRequest::ListItems { offset, limit }).await;
        let catalog = self.catalog.lock().expect("couldn't acquire mock lock");
        if catalog.list_unavailable {
            return Err(CatalogClientError::UnexpectedStatus {
                resource: Resource::ItemList,
                status: StatusCode::SERVICE_UNAVAILABLE,
            });
        }

        let mut ids = catalog.items.iter().map(|item| item.id).collect::<Vec<_>>();
        ids.sort_unstable();

        let items = ids
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|id| CatalogItemSummary {
                name: catalog
                    .items
                    .iter()
                    .find(|item| item.id == id)
                    .map(|item| item.name.clone())
                    .unwrap_or_default(),
                reference_url: format!("{MOCK_REFERENCE_BASE}/pokemon/{id}/"),
            })
            .collect();

        Ok(ItemListPage {
            items,
            total_count: catalog
                .total_count
                .unwrap_or(catalog.items.len() as u64),
        })
    }

    async fn get_item_by_id(&self, id: u32) -> Result<CatalogItemDetail, CatalogClientError> {
        self.record(MockRequest::ItemById(id)).await;
        self.lookup_item(&id.to_string(), |item| item.id == id)
    }

    async fn get_item_by_name(
        &self,
        name: impl AsRef<str> + Send + Sync,
    ) -> Result<CatalogItemDetail, CatalogClientError> {
        let name = name.as_ref().trim().to_lowercase();
        self.record(MockRequest::ItemByName(name.clone())).await;
        self.lookup_item(&name, |item| item.name == name)
    }

    async fn get_species_by_id(&self, id: u32) -> Result<SpeciesInfo, CatalogClientError> {
        self.record(MockRequest::Species(id)).await;
        self.catalog
            .lock()
            .expect("couldn't acquire mock lock")
            .species
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogClientError::NotFound {
                resource: Resource::Species,
                key: id.to_string(),
            })
    }

    async fn get_evolution_chain_by_id(
        &self,
        id: u32,
    ) -> Result<EvolutionNode, CatalogClientError> {
        self.record(MockRequest::EvolutionChain(id)).await;
        self.catalog
            .lock()
            .expect("couldn't acquire mock lock")
            .evolution_chains
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogClientError::NotFound {
                resource: Resource::EvolutionChain,
                key: id.to_string(),
            })
    }

    async fn list_types(&self) -> Result<Vec<TypeSummary>, CatalogClientError> {
        self.record(MockRequest::Types).await;
        Ok(self
            .catalog
            .lock()
            .expect("couldn't acquire mock lock")
            .types
            .clone())
    }
}

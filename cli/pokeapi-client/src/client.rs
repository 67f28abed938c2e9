//! Catalog client for the PokeAPI REST endpoints.

use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use enum_dispatch::enum_dispatch;
use reqwest::header::{self, HeaderMap};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::CatalogClientConfig;
use crate::error::{CatalogClientError, Resource};
use crate::mock::MockClient;
use crate::types::*;

/// Number of attempts made for a single request.
///
/// A failed request is retried once, unless the failure says the entity
/// does not exist.
const MAX_ATTEMPTS: usize = 2;

/// A client for the PokeAPI catalog.
///
/// Handles HTTP client configuration with timeouts, path construction and
/// the translation of HTTP responses into [`CatalogClientError`]s.
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogClientConfig,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("catalog_url", &self.config.catalog_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    /// Get the configured catalog URL.
    pub fn catalog_url(&self) -> &str {
        &self.config.catalog_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.catalog_url.trim_end_matches('/'), path)
    }

    /// GET `path` and decode the JSON body, retrying once on failures
    /// other than "not found".
    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: Resource,
        key: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogClientError> {
        let url = self.endpoint(path);
        let mut attempt = 1;
        loop {
            match self.get_json_once(resource, key, &url, query).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    debug!(%resource, key, attempt, error = %err, "retrying catalog request");
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        resource: Resource,
        key: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogClientError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| CatalogClientError::Transport { resource, source })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(CatalogClientError::NotFound {
                    resource,
                    key: key.to_string(),
                });
            },
            status if !status.is_success() => {
                return Err(CatalogClientError::UnexpectedStatus { resource, status });
            },
            _ => {},
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| CatalogClientError::Transport { resource, source })?;

        serde_json::from_slice(&body)
            .map_err(|source| CatalogClientError::MalformedResponse { resource, source })
    }
}

// ---------------------------------------------------------------------------
// Catalog trait
// ---------------------------------------------------------------------------

/// Either a client for the actual catalog service,
/// or a mock client for testing.
#[derive(Debug)]
#[enum_dispatch(ClientTrait)]
pub enum Client {
    Catalog(CatalogClient),
    Mock(MockClient),
}

/// The catalog operations the browser depends on.
///
/// This trait enables alternate implementations:
/// - **HTTP**: REST calls to PokeAPI via [`CatalogClient`]
/// - **Mock**: canned responses without HTTP via [`MockClient`]
#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// Fetch one page of the item list.
    async fn list_items(&self, offset: u64, limit: u64)
        -> Result<ItemListPage, CatalogClientError>;

    /// Fetch the full record of a single item by id.
    async fn get_item_by_id(&self, id: u32) -> Result<CatalogItemDetail, CatalogClientError>;

    /// Fetch the full record of a single item by name.
    ///
    /// The name is lowercased before the request is made.
    async fn get_item_by_name(
        &self,
        name: impl AsRef<str> + Send + Sync,
    ) -> Result<CatalogItemDetail, CatalogClientError>;

    /// Fetch the species record, which links to the evolution chain.
    async fn get_species_by_id(&self, id: u32) -> Result<SpeciesInfo, CatalogClientError>;

    /// Fetch the root node of an evolution chain.
    async fn get_evolution_chain_by_id(&self, id: u32)
        -> Result<EvolutionNode, CatalogClientError>;

    /// Fetch all item types known to the catalog.
    async fn list_types(&self) -> Result<Vec<TypeSummary>, CatalogClientError>;

    /// Fetch a single item addressed either by id or by name.
    async fn get_item(&self, item: &ItemRef) -> Result<CatalogItemDetail, CatalogClientError> {
        match item {
            ItemRef::Id(id) => self.get_item_by_id(*id).await,
            ItemRef::Name(name) => self.get_item_by_name(name).await,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientTrait implementation for CatalogClient
// ---------------------------------------------------------------------------

impl ClientTrait for CatalogClient {
    #[instrument(skip(self))]
    async fn list_items(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<ItemListPage, CatalogClientError> {
        debug!(offset, limit, "listing catalog items");
        let list: api::NamedResourceList = self
            .get_json(
                Resource::ItemList,
                &format!("offset={offset}"),
                "pokemon",
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(list.into())
    }

    #[instrument(skip(self))]
    async fn get_item_by_id(&self, id: u32) -> Result<CatalogItemDetail, CatalogClientError> {
        let key = id.to_string();
        let pokemon: api::Pokemon = self
            .get_json(Resource::Item, &key, &format!("pokemon/{id}"), &[])
            .await?;
        Ok(pokemon.into())
    }

    #[instrument(skip_all)]
    async fn get_item_by_name(
        &self,
        name: impl AsRef<str> + Send + Sync,
    ) -> Result<CatalogItemDetail, CatalogClientError> {
        let name = name.as_ref().trim().to_lowercase();
        if name.is_empty() {
            return Err(CatalogClientError::InvalidReference(name));
        }
        debug!(name, "fetching item by name");
        let pokemon: api::Pokemon = self
            .get_json(Resource::Item, &name, &format!("pokemon/{name}"), &[])
            .await?;
        Ok(pokemon.into())
    }

    #[instrument(skip(self))]
    async fn get_species_by_id(&self, id: u32) -> Result<SpeciesInfo, CatalogClientError> {
        let key = id.to_string();
        let species: api::PokemonSpecies = self
            .get_json(Resource::Species, &key, &format!("pokemon-species/{id}"), &[])
            .await?;
        Ok(species.into())
    }

    #[instrument(skip(self))]
    async fn get_evolution_chain_by_id(
        &self,
        id: u32,
    ) -> Result<EvolutionNode, CatalogClientError> {
        let key = id.to_string();
        let chain: api::EvolutionChain = self
            .get_json(
                Resource::EvolutionChain,
                &key,
                &format!("evolution-chain/{id}"),
                &[],
            )
            .await?;
        Ok(chain.chain.into())
    }

    #[instrument(skip_all)]
    async fn list_types(&self) -> Result<Vec<TypeSummary>, CatalogClientError> {
        let list: api::NamedResourceList = self
            .get_json(Resource::TypeList, "type", "type", &[])
            .await?;
        Ok(list.into())
    }
}

fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key).map_err(
                |e: reqwest::header::InvalidHeaderName| CatalogClientError::Other(e.to_string()),
            )?,
            header::HeaderValue::from_str(value).map_err(
                |e: reqwest::header::InvalidHeaderValue| CatalogClientError::Other(e.to_string()),
            )?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder
        .build()
        .map_err(|e| CatalogClientError::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use httpmock::Method::GET;
    use httpmock::MockServer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn client_config(url: &str) -> CatalogClientConfig {
        CatalogClientConfig {
            catalog_url: url.to_string(),
            extra_headers: Default::default(),
            user_agent: None,
        }
    }

    fn pokemon_json(id: u32, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "height": 7,
            "weight": 69,
            "base_experience": 64,
            "types": [
                { "slot": 1, "type": { "name": "grass", "url": "https://pokeapi.co/api/v2/type/12/" } },
                { "slot": 2, "type": { "name": "poison", "url": "https://pokeapi.co/api/v2/type/4/" } }
            ],
            "sprites": { "front_default": null, "other": null },
            "abilities": [],
            "stats": [],
            "species": { "name": name, "url": format!("https://pokeapi.co/api/v2/pokemon-species/{id}/") }
        })
    }

    #[tokio::test]
    async fn list_items_sends_offset_and_limit() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/pokemon")
                .query_param("offset", "40")
                .query_param("limit", "20");
            then.status(200).json_body(json!({
                "count": 1302,
                "next": null,
                "previous": null,
                "results": [
                    { "name": "nidoran-f", "url": "https://pokeapi.co/api/v2/pokemon/29/" },
                    { "name": "nidorina", "url": "https://pokeapi.co/api/v2/pokemon/30/" }
                ]
            }));
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let page = client.list_items(40, 20).await.unwrap();

        mock.assert();
        assert_eq!(page.total_count, 1302);
        let ids = page
            .items
            .iter()
            .map(|item| item.id().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![29, 30]);
    }

    #[tokio::test]
    async fn get_item_by_name_lowercases_name() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/pokemon/bulbasaur");
            then.status(200).json_body(pokemon_json(1, "bulbasaur"));
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let item = client.get_item_by_name("BulbaSaur").await.unwrap();

        mock.assert();
        assert_eq!(item.id, 1);
        assert_eq!(item.type_names().collect::<Vec<_>>(), vec!["grass", "poison"]);
    }

    #[tokio::test]
    async fn get_item_dispatches_on_reference() {
        let server = MockServer::start_async().await;
        let by_id = server.mock(|when, then| {
            when.method(GET).path("/pokemon/1");
            then.status(200).json_body(pokemon_json(1, "bulbasaur"));
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let item = client.get_item(&ItemRef::Id(1)).await.unwrap();

        by_id.assert();
        assert_eq!(item.name, "bulbasaur");
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/pokemon/missingno");
            then.status(404).body("Not Found");
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let err = client.get_item_by_name("missingno").await.unwrap_err();

        mock.assert_hits(1);
        assert!(err.is_not_found(), "expected NotFound, found: {err:?}");
    }

    #[tokio::test]
    async fn server_errors_are_retried_once() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/pokemon-species/1");
            then.status(503);
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let err = client.get_species_by_id(1).await.unwrap_err();

        mock.assert_hits(2);
        assert!(
            matches!(err, CatalogClientError::UnexpectedStatus {
                resource: Resource::Species,
                status: StatusCode::SERVICE_UNAVAILABLE
            }),
            "found: {err:?}"
        );
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/type");
            then.status(200).body("{ not json");
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let err = client.list_types().await.unwrap_err();

        mock.assert_hits(2);
        assert!(
            matches!(err, CatalogClientError::MalformedResponse { .. }),
            "found: {err:?}"
        );
    }

    #[tokio::test]
    async fn evolution_chain_returns_root_node() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/evolution-chain/1");
            then.status(200).json_body(json!({
                "id": 1,
                "baby_trigger_item": null,
                "chain": {
                    "is_baby": false,
                    "species": { "name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon-species/1/" },
                    "evolution_details": [],
                    "evolves_to": [{
                        "is_baby": false,
                        "species": { "name": "ivysaur", "url": "https://pokeapi.co/api/v2/pokemon-species/2/" },
                        "evolution_details": [
                            { "min_level": 16, "trigger": { "name": "level-up", "url": "" } }
                        ],
                        "evolves_to": []
                    }]
                }
            }));
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let root = client.get_evolution_chain_by_id(1).await.unwrap();

        mock.assert();
        assert_eq!(root.species_name, "bulbasaur");
        assert_eq!(root.child_nodes[0].evolution_requirements, vec![
            EvolutionRequirement {
                min_level: Some(16),
                trigger_name: Some("level-up".to_string()),
            }
        ]);
    }

    #[tokio::test]
    async fn sends_extra_headers_and_user_agent() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/type")
                .header("x-pokedex-source", "tests")
                .header("user-agent", "pokedex/test");
            then.status(200).json_body(json!({
                "count": 2,
                "results": [
                    { "name": "normal", "url": "https://pokeapi.co/api/v2/type/1/" },
                    { "name": "fire", "url": "https://pokeapi.co/api/v2/type/10/" }
                ]
            }));
        });

        let config = CatalogClientConfig {
            catalog_url: format!("{}/", server.base_url()),
            extra_headers: BTreeMap::from([(
                "x-pokedex-source".to_string(),
                "tests".to_string(),
            )]),
            user_agent: Some("pokedex/test".to_string()),
        };
        let client = CatalogClient::new(config).unwrap();
        let types = client.list_types().await.unwrap();

        mock.assert();
        assert_eq!(types, vec![
            TypeSummary {
                name: "normal".to_string()
            },
            TypeSummary {
                name: "fire".to_string()
            },
        ]);
    }

    #[test]
    fn rejects_invalid_header_names() {
        let config = CatalogClientConfig {
            extra_headers: BTreeMap::from([("bad header".to_string(), "x".to_string())]),
            ..CatalogClientConfig::default()
        };
        assert!(matches!(
            CatalogClient::new(config),
            Err(CatalogClientError::Other(_))
        ));
    }
}

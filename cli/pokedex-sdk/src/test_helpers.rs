//! Fixtures shared by the unit tests of this crate and of the binary.

use pokeapi_client::types::{
    CatalogItemDetail, EvolutionNode, EvolutionRequirement, SpeciesInfo, Sprites, TypeSlot,
};
use pokeapi_client::{Client, MockCatalog, MockClient};

use crate::providers::cache::CatalogCache;

const BASE: &str = "https://pokeapi.co/api/v2";

/// An item without types.
pub fn item(id: u32, name: &str) -> CatalogItemDetail {
    typed_item(id, name, &[])
}

pub fn typed_item(id: u32, name: &str, types: &[&str]) -> CatalogItemDetail {
    CatalogItemDetail {
        id,
        name: name.to_string(),
        types: types
            .iter()
            .map(|name| TypeSlot {
                name: name.to_string(),
            })
            .collect(),
        sprites: Sprites::default(),
        height: 10,
        weight: 100,
        base_experience: None,
        abilities: vec![],
        stats: vec![],
        species_reference_url: species_url(id),
    }
}

pub fn species_url(id: u32) -> String {
    format!("{BASE}/pokemon-species/{id}/")
}

pub fn species(name: &str, chain_id: u32) -> SpeciesInfo {
    SpeciesInfo {
        name: name.to_string(),
        evolution_chain_reference_url: format!("{BASE}/evolution-chain/{chain_id}/"),
    }
}

/// A chain node whose incoming edge carries `requirements`.
pub fn node(
    id: u32,
    name: &str,
    requirements: Vec<EvolutionRequirement>,
    child_nodes: Vec<EvolutionNode>,
) -> EvolutionNode {
    EvolutionNode {
        species_name: name.to_string(),
        species_reference_url: species_url(id),
        evolution_requirements: requirements,
        child_nodes,
    }
}

pub fn level_up(min_level: u32) -> EvolutionRequirement {
    EvolutionRequirement {
        min_level: Some(min_level),
        trigger_name: Some("level-up".to_string()),
    }
}

pub fn trigger(name: &str) -> EvolutionRequirement {
    EvolutionRequirement {
        min_level: None,
        trigger_name: Some(name.to_string()),
    }
}

/// bulbasaur -> ivysaur (16) -> venusaur (32)
pub fn bulbasaur_chain() -> EvolutionNode {
    node(1, "bulbasaur", vec![], vec![node(
        2,
        "ivysaur",
        vec![level_up(16)],
        vec![node(3, "venusaur", vec![level_up(32)], vec![])],
    )])
}

/// oddish -> gloom (21) -> {vileplume, bellossom}
pub fn oddish_chain() -> EvolutionNode {
    node(43, "oddish", vec![], vec![node(
        44,
        "gloom",
        vec![level_up(21)],
        vec![
            node(45, "vileplume", vec![trigger("use-item")], vec![]),
            node(182, "bellossom", vec![trigger("use-item")], vec![]),
        ],
    )])
}

pub fn mock_client(catalog: MockCatalog) -> MockClient {
    MockClient::from_catalog(catalog)
}

/// A cache over a mock client seeded with `items`, plus a handle to the
/// mock for asserting on requests.
pub fn mock_cache(items: Vec<CatalogItemDetail>) -> (CatalogCache, MockClient) {
    let mock = mock_client(MockCatalog {
        items,
        ..Default::default()
    });
    (CatalogCache::new(Client::Mock(mock.clone())), mock)
}

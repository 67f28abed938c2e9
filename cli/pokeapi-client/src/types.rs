//! Catalog interaction types.
//!
//! The [`api`] module mirrors the JSON payloads returned by PokeAPI.
//! The types at the top level are the domain model handed to consumers,
//! converted from the raw payloads with richer semantics and only the
//! fields the browser needs.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CatalogClientError;

// ---------------------------------------------------------------------------
// Reference parsing
// ---------------------------------------------------------------------------

/// Extract the numeric id encoded as the last non-empty path segment of a
/// catalog reference URL, e.g. `https://pokeapi.co/api/v2/pokemon-species/25/`.
///
/// Fails with [`CatalogClientError::InvalidReference`] if there is no such
/// segment or it is not a positive integer.
pub fn parse_reference_id(reference_url: &str) -> Result<u32, CatalogClientError> {
    let invalid = || CatalogClientError::InvalidReference(reference_url.to_string());

    let last_segment = match Url::parse(reference_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        // Relative references are split verbatim
        Err(_) => reference_url
            .split('/')
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string),
    };

    let id = last_segment
        .ok_or_else(invalid)?
        .parse::<u32>()
        .map_err(|_| invalid())?;

    if id == 0 {
        return Err(invalid());
    }
    Ok(id)
}

// ---------------------------------------------------------------------------
// Item references
// ---------------------------------------------------------------------------

/// How a user addresses a single catalog item: by numeric id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Id(u32),
    Name(String),
}

impl FromStr for ItemRef {
    type Err = CatalogClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CatalogClientError::InvalidReference(s.to_string()));
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return match s.parse::<u32>() {
                Ok(id) if id > 0 => Ok(ItemRef::Id(id)),
                _ => Err(CatalogClientError::InvalidReference(s.to_string())),
            };
        }
        Ok(ItemRef::Name(s.to_lowercase()))
    }
}

impl Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemRef::Id(id) => write!(f, "{id}"),
            ItemRef::Name(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Item list
// ---------------------------------------------------------------------------

/// Minimal list entry; only used to derive the item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemSummary {
    pub name: String,
    pub reference_url: String,
}

impl CatalogItemSummary {
    pub fn id(&self) -> Result<u32, CatalogClientError> {
        parse_reference_id(&self.reference_url)
    }
}

/// One page of the remote item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemListPage {
    pub items: Vec<CatalogItemSummary>,
    pub total_count: u64,
}

impl From<api::NamedResourceList> for ItemListPage {
    fn from(list: api::NamedResourceList) -> Self {
        Self {
            items: list
                .results
                .into_iter()
                .map(|entry| CatalogItemSummary {
                    name: entry.name,
                    reference_url: entry.url,
                })
                .collect(),
            total_count: list.count,
        }
    }
}

// ---------------------------------------------------------------------------
// Item detail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprites {
    pub primary: Option<String>,
    pub artwork: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub base_value: u8,
}

/// Full record of a single catalog item.
///
/// Immutable once fetched. Height is in decimetres and weight in
/// hectograms, as delivered by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemDetail {
    pub id: u32,
    pub name: String,
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub sprites: Sprites,
    pub height: u32,
    pub weight: u32,
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub stats: Vec<Stat>,
    pub species_reference_url: String,
}

impl CatalogItemDetail {
    /// Names of the item's types in slot order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }
}

impl AsRef<CatalogItemDetail> for CatalogItemDetail {
    fn as_ref(&self) -> &CatalogItemDetail {
        self
    }
}

impl From<api::Pokemon> for CatalogItemDetail {
    fn from(pokemon: api::Pokemon) -> Self {
        let artwork = pokemon
            .sprites
            .other
            .and_then(|other| other.official_artwork)
            .and_then(|artwork| artwork.front_default);

        Self {
            id: pokemon.id,
            name: pokemon.name,
            types: pokemon
                .types
                .into_iter()
                .map(|slot| TypeSlot {
                    name: slot.type_.name,
                })
                .collect(),
            sprites: Sprites {
                primary: pokemon.sprites.front_default,
                artwork,
            },
            height: pokemon.height,
            weight: pokemon.weight,
            base_experience: pokemon.base_experience,
            abilities: pokemon
                .abilities
                .into_iter()
                .map(|slot| Ability {
                    name: slot.ability.name,
                    is_hidden: slot.is_hidden,
                })
                .collect(),
            stats: pokemon
                .stats
                .into_iter()
                .map(|stat| Stat {
                    name: stat.stat.name,
                    base_value: stat.base_stat,
                })
                .collect(),
            species_reference_url: pokemon.species.url,
        }
    }
}

// ---------------------------------------------------------------------------
// Species and evolution chains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesInfo {
    pub name: String,
    /// Empty when the species does not link to a chain.
    pub evolution_chain_reference_url: String,
}

impl From<api::PokemonSpecies> for SpeciesInfo {
    fn from(species: api::PokemonSpecies) -> Self {
        Self {
            name: species.name,
            evolution_chain_reference_url: species
                .evolution_chain
                .map(|chain| chain.url)
                .unwrap_or_default(),
        }
    }
}

/// Condition attached to the edge leading into an evolution node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionRequirement {
    pub min_level: Option<u32>,
    pub trigger_name: Option<String>,
}

/// A node of the raw evolution tree as delivered by the catalog.
///
/// The root carries no requirement into itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionNode {
    pub species_name: String,
    pub species_reference_url: String,
    #[serde(default)]
    pub evolution_requirements: Vec<EvolutionRequirement>,
    #[serde(default)]
    pub child_nodes: Vec<EvolutionNode>,
}

impl From<api::ChainLink> for EvolutionNode {
    fn from(link: api::ChainLink) -> Self {
        Self {
            species_name: link.species.name,
            species_reference_url: link.species.url,
            evolution_requirements: link
                .evolution_details
                .into_iter()
                .map(|detail| EvolutionRequirement {
                    min_level: detail.min_level,
                    trigger_name: detail.trigger.map(|trigger| trigger.name),
                })
                .collect(),
            child_nodes: link.evolves_to.into_iter().map(EvolutionNode::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeSummary {
    pub name: String,
}

impl From<api::NamedResourceList> for Vec<TypeSummary> {
    fn from(list: api::NamedResourceList) -> Self {
        list.results
            .into_iter()
            .map(|entry| TypeSummary { name: entry.name })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Raw API payloads
// ---------------------------------------------------------------------------

/// Wire format of the PokeAPI v2 endpoints we consume.
///
/// Unknown fields are ignored, missing collections default to empty.
pub mod api {
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    pub struct NamedResource {
        pub name: String,
        pub url: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct Resource {
        pub url: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct NamedResourceList {
        pub count: u64,
        #[serde(default)]
        pub results: Vec<NamedResource>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct Pokemon {
        pub id: u32,
        pub name: String,
        pub height: u32,
        pub weight: u32,
        pub base_experience: Option<u32>,
        #[serde(default)]
        pub types: Vec<TypeSlot>,
        #[serde(default)]
        pub sprites: Sprites,
        #[serde(default)]
        pub abilities: Vec<AbilitySlot>,
        #[serde(default)]
        pub stats: Vec<StatSlot>,
        pub species: NamedResource,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct TypeSlot {
        #[serde(rename = "type")]
        pub type_: NamedResource,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct Sprites {
        pub front_default: Option<String>,
        pub other: Option<OtherSprites>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct OtherSprites {
        #[serde(rename = "official-artwork")]
        pub official_artwork: Option<Artwork>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct Artwork {
        pub front_default: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct AbilitySlot {
        pub ability: NamedResource,
        #[serde(default)]
        pub is_hidden: bool,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct StatSlot {
        pub base_stat: u8,
        pub stat: NamedResource,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct PokemonSpecies {
        pub name: String,
        pub evolution_chain: Option<Resource>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct EvolutionChain {
        pub chain: ChainLink,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ChainLink {
        pub species: NamedResource,
        #[serde(default)]
        pub evolution_details: Vec<EvolutionDetail>,
        #[serde(default)]
        pub evolves_to: Vec<ChainLink>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct EvolutionDetail {
        pub min_level: Option<u32>,
        pub trigger: Option<NamedResource>,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_id_from_reference_with_trailing_slash() {
        let id = parse_reference_id("https://pokeapi.co/api/v2/pokemon-species/25/").unwrap();
        assert_eq!(id, 25);
    }

    #[test]
    fn parses_id_from_reference_without_trailing_slash() {
        let id = parse_reference_id("https://pokeapi.co/api/v2/evolution-chain/10").unwrap();
        assert_eq!(id, 10);
    }

    #[test]
    fn parses_id_from_relative_reference() {
        assert_eq!(parse_reference_id("/pokemon/133/").unwrap(), 133);
    }

    #[test]
    fn rejects_reference_without_numeric_segment() {
        for reference in [
            "",
            "https://pokeapi.co/",
            "https://pokeapi.co/api/v2/pokemon-species/pikachu/",
            "https://pokeapi.co/api/v2/pokemon-species/0/",
            "https://pokeapi.co/api/v2/pokemon-species/-3/",
        ] {
            let result = parse_reference_id(reference);
            assert!(
                matches!(result, Err(CatalogClientError::InvalidReference(_))),
                "expected InvalidReference for {reference:?}, found: {result:?}"
            );
        }
    }

    #[test]
    fn item_ref_distinguishes_ids_and_names() {
        assert_eq!("25".parse::<ItemRef>().unwrap(), ItemRef::Id(25));
        assert_eq!(
            "Pikachu".parse::<ItemRef>().unwrap(),
            ItemRef::Name("pikachu".to_string())
        );
        assert_eq!(
            "porygon2".parse::<ItemRef>().unwrap(),
            ItemRef::Name("porygon2".to_string())
        );
        assert!("0".parse::<ItemRef>().is_err());
        assert!("  ".parse::<ItemRef>().is_err());
    }

    #[test]
    fn converts_pokemon_payload() {
        let payload = json!({
            "id": 25,
            "name": "pikachu",
            "height": 4,
            "weight": 60,
            "base_experience": 112,
            "types": [ { "slot": 1, "type": { "name": "electric", "url": "https://pokeapi.co/api/v2/type/13/" } } ],
            "sprites": {
                "front_default": "front.png",
                "other": { "official-artwork": { "front_default": "art.png" } }
            },
            "abilities": [
                { "ability": { "name": "static", "url": "" }, "is_hidden": false, "slot": 1 },
                { "ability": { "name": "lightning-rod", "url": "" }, "is_hidden": true, "slot": 3 }
            ],
            "stats": [ { "base_stat": 35, "effort": 0, "stat": { "name": "hp", "url": "" } } ],
            "species": { "name": "pikachu", "url": "https://pokeapi.co/api/v2/pokemon-species/25/" },
            "moves": []
        });

        let raw: api::Pokemon = serde_json::from_value(payload).unwrap();
        let detail = CatalogItemDetail::from(raw);

        assert_eq!(detail, CatalogItemDetail {
            id: 25,
            name: "pikachu".to_string(),
            types: vec![TypeSlot {
                name: "electric".to_string()
            }],
            sprites: Sprites {
                primary: Some("front.png".to_string()),
                artwork: Some("art.png".to_string()),
            },
            height: 4,
            weight: 60,
            base_experience: Some(112),
            abilities: vec![
                Ability {
                    name: "static".to_string(),
                    is_hidden: false
                },
                Ability {
                    name: "lightning-rod".to_string(),
                    is_hidden: true
                },
            ],
            stats: vec![Stat {
                name: "hp".to_string(),
                base_value: 35
            }],
            species_reference_url: "https://pokeapi.co/api/v2/pokemon-species/25/".to_string(),
        });
    }

    #[test]
    fn converts_chain_keeping_all_requirements() {
        let payload = json!({
            "species": { "name": "eevee", "url": "https://pokeapi.co/api/v2/pokemon-species/133/" },
            "evolution_details": [],
            "evolves_to": [{
                "species": { "name": "espeon", "url": "https://pokeapi.co/api/v2/pokemon-species/196/" },
                "evolution_details": [
                    { "min_level": null, "trigger": { "name": "level-up", "url": "" } },
                    { "min_level": null, "trigger": { "name": "use-item", "url": "" } }
                ],
                "evolves_to": []
            }]
        });

        let raw: api::ChainLink = serde_json::from_value(payload).unwrap();
        let node = EvolutionNode::from(raw);

        assert_eq!(node.species_name, "eevee");
        assert!(node.evolution_requirements.is_empty());
        assert_eq!(node.child_nodes.len(), 1);
        assert_eq!(node.child_nodes[0].evolution_requirements, vec![
            EvolutionRequirement {
                min_level: None,
                trigger_name: Some("level-up".to_string())
            },
            EvolutionRequirement {
                min_level: None,
                trigger_name: Some("use-item".to_string())
            },
        ]);
    }

    #[test]
    fn species_without_chain_has_empty_reference() {
        let raw: api::PokemonSpecies =
            serde_json::from_value(json!({ "name": "missingno", "evolution_chain": null }))
                .unwrap();
        let species = SpeciesInfo::from(raw);
        assert_eq!(species.evolution_chain_reference_url, "");
    }

    proptest! {
        #[test]
        fn parses_any_positive_id(id in 1..=u32::MAX, resource in "[a-z][a-z-]{0,16}", trailing_slash: bool) {
            let slash = if trailing_slash { "/" } else { "" };
            let reference = format!("https://pokeapi.co/api/v2/{resource}/{id}{slash}");
            prop_assert_eq!(parse_reference_id(&reference).unwrap(), id);
        }
    }
}

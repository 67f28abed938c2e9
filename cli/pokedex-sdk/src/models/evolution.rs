//! Evolution chains flattened into linear root-to-leaf paths.

use pokeapi_client::parse_reference_id;
use pokeapi_client::types::{EvolutionNode, ItemRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::providers::cache::{CatalogCache, FetchError};

/// One flattened node of an evolution chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionStage {
    pub id: u32,
    pub name: String,
    /// Level required to reach this stage, if any.
    pub min_level: Option<u32>,
    /// How this stage is reached, e.g. `level-up` or `use-item`.
    pub trigger_name: Option<String>,
}

/// Stages from the chain root to one leaf.
pub type EvolutionPath = Vec<EvolutionStage>;

#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("invalid evolution reference '{0}'")]
    InvalidReference(String),

    #[error("evolution data does not exist")]
    NotFound(#[source] FetchError),

    #[error("failed to fetch evolution data")]
    Upstream(#[source] FetchError),

    #[error("failed to look up item")]
    Item(#[source] FetchError),
}

impl EvolutionError {
    fn from_fetch(err: FetchError) -> Self {
        if err.is_not_found() {
            EvolutionError::NotFound(err)
        } else if err.is_invalid_reference() {
            EvolutionError::InvalidReference(err.inner().to_string())
        } else {
            EvolutionError::Upstream(err)
        }
    }
}

/// Evolution data as presented next to an item.
///
/// Evolution data is supplementary, so a missing or broken reference is
/// shown as [`EvolutionData::Unavailable`] rather than as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvolutionData {
    Paths(Vec<EvolutionPath>),
    Unavailable,
}

/// Flatten an evolution tree into one path per leaf, in document order.
///
/// Each node contributes a stage built from its own species and the first of
/// its evolution requirements. Sibling branches each extend their own copy
/// of the shared prefix.
pub fn flatten_paths(root: &EvolutionNode) -> Result<Vec<EvolutionPath>, EvolutionError> {
    let mut paths = Vec::new();
    collect_paths(root, Vec::new(), &mut paths)?;
    Ok(paths)
}

fn collect_paths(
    node: &EvolutionNode,
    mut prefix: EvolutionPath,
    paths: &mut Vec<EvolutionPath>,
) -> Result<(), EvolutionError> {
    prefix.push(stage(node)?);

    if node.child_nodes.is_empty() {
        paths.push(prefix);
        return Ok(());
    }

    for child in &node.child_nodes {
        collect_paths(child, prefix.clone(), paths)?;
    }
    Ok(())
}

fn stage(node: &EvolutionNode) -> Result<EvolutionStage, EvolutionError> {
    let id = parse_reference_id(&node.species_reference_url)
        .map_err(|_| EvolutionError::InvalidReference(node.species_reference_url.clone()))?;
    let requirement = node.evolution_requirements.first();

    Ok(EvolutionStage {
        id,
        name: node.species_name.clone(),
        min_level: requirement.and_then(|r| r.min_level),
        trigger_name: requirement.and_then(|r| r.trigger_name.clone()),
    })
}

/// Resolves species references into evolution paths through the shared
/// cache.
#[derive(Debug, Clone)]
pub struct EvolutionResolver {
    cache: CatalogCache,
}

impl EvolutionResolver {
    pub fn new(cache: CatalogCache) -> Self {
        Self { cache }
    }

    /// Resolve the evolution paths of the species at `species_reference_url`.
    ///
    /// The species is fetched first, then the chain it links to.
    /// Either step failing short-circuits the rest.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        species_reference_url: &str,
    ) -> Result<Vec<EvolutionPath>, EvolutionError> {
        let species_id = parse_reference_id(species_reference_url)
            .map_err(|_| EvolutionError::InvalidReference(species_reference_url.to_string()))?;

        let species = self
            .cache
            .species(species_id)
            .await
            .map_err(EvolutionError::from_fetch)?;

        let chain_id = parse_reference_id(&species.evolution_chain_reference_url).map_err(|_| {
            EvolutionError::InvalidReference(species.evolution_chain_reference_url.clone())
        })?;

        let root = self
            .cache
            .evolution_chain(chain_id)
            .await
            .map_err(EvolutionError::from_fetch)?;

        let paths = flatten_paths(&root)?;
        debug!(species_id, chain_id, n_paths = paths.len(), "resolved evolution chain");
        Ok(paths)
    }

    /// Like [`Self::resolve`], but reports missing or invalid references as
    /// [`EvolutionData::Unavailable`]. Only upstream failures are errors.
    pub async fn resolve_or_unavailable(
        &self,
        species_reference_url: &str,
    ) -> Result<EvolutionData, EvolutionError> {
        match self.resolve(species_reference_url).await {
            Ok(paths) => Ok(EvolutionData::Paths(paths)),
            Err(EvolutionError::InvalidReference(reference)) => {
                debug!(reference, "no evolution data: invalid reference");
                Ok(EvolutionData::Unavailable)
            },
            Err(EvolutionError::NotFound(err)) => {
                debug!(%err, "no evolution data: not found");
                Ok(EvolutionData::Unavailable)
            },
            Err(err) => Err(err),
        }
    }

    /// Look up an item and resolve the evolution chain of its species.
    pub async fn resolve_for_item(&self, item: &ItemRef) -> Result<EvolutionData, EvolutionError> {
        let detail = self.cache.lookup(item).await.map_err(EvolutionError::Item)?;
        self.resolve_or_unavailable(&detail.species_reference_url)
            .await
    }
}
